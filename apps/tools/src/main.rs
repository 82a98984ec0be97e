use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::{CampaignId, ListId, SubscriberId},
    protocol::NewTemplate,
};
use storage::Storage;

/// Direct database maintenance for the campaign store.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/campaigns.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateTemplate {
        name: String,
        subject: String,
        #[arg(long, default_value = "")]
        html: String,
        #[arg(long, default_value = "")]
        text: String,
    },
    CreateList {
        name: String,
    },
    CreateSubscriber {
        name: String,
        email: String,
    },
    Attach {
        campaign_id: i64,
        list_id: i64,
    },
    Subscribe {
        subscriber_id: i64,
        list_id: i64,
    },
    DeleteList {
        list_id: i64,
    },
    /// Inserts `count` templates named `<prefix>-NN`.
    SeedTemplates {
        #[arg(long, default_value_t = 25)]
        count: usize,
        #[arg(long, default_value = "template")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateTemplate {
            name,
            subject,
            html,
            text,
        } => {
            let template = NewTemplate {
                name,
                subject,
                html_part: html,
                text_part: text,
            };
            let Some(created) = storage.create_template(&template).await? else {
                bail!("a template named '{}' already exists", template.name);
            };
            println!("created template_id={}", created.id);
        }
        Command::CreateList { name } => {
            let list = storage.create_list(&name).await?;
            println!("created list_id={}", list.id);
        }
        Command::CreateSubscriber { name, email } => {
            let Some(subscriber) = storage.create_subscriber(&name, &email).await? else {
                bail!("a subscriber with email '{email}' already exists");
            };
            println!("created subscriber_id={}", subscriber.id);
        }
        Command::Attach {
            campaign_id,
            list_id,
        } => {
            let attached = storage
                .attach_campaign_to_list(CampaignId(campaign_id), ListId(list_id))
                .await?;
            println!("attached={attached}");
        }
        Command::Subscribe {
            subscriber_id,
            list_id,
        } => {
            let subscribed = storage
                .subscribe_to_list(SubscriberId(subscriber_id), ListId(list_id))
                .await?;
            println!("subscribed={subscribed}");
        }
        Command::DeleteList { list_id } => match storage.delete_list(ListId(list_id)).await? {
            Some(deletion) => println!(
                "deleted list_id={list_id} campaign_links={} subscriber_links={}",
                deletion.campaign_links, deletion.subscriber_links
            ),
            None => bail!("list {list_id} does not exist"),
        },
        Command::SeedTemplates { count, prefix } => {
            let mut created = 0;
            for i in 0..count {
                let template = NewTemplate {
                    name: format!("{prefix}-{i:02}"),
                    subject: format!("Subject {i}"),
                    ..NewTemplate::default()
                };
                if storage.create_template(&template).await?.is_some() {
                    created += 1;
                }
            }
            println!("seeded {created} of {count} templates");
        }
    }

    Ok(())
}
