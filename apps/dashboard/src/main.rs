use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    CampaignFlows, ClientEvent, CreateOutcome, DeleteOutcome, HttpCampaignApi, Notification,
    PagerStep, Session, TemplatePager,
};
use shared::{
    domain::{CampaignId, ListId},
    protocol::{CampaignForm, NewList},
};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Command-line front end for the campaign dashboard.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, env = "DASHBOARD_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    server_url: String,
    #[arg(long, env = "DASHBOARD_USER")]
    user: Option<String>,
    #[arg(long, env = "DASHBOARD_PASSWORD")]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists every campaign.
    Campaigns,
    CreateCampaign {
        name: String,
        template_name: String,
    },
    DeleteCampaign {
        campaign_id: i64,
    },
    /// Walks every template page.
    Templates,
    CreateList {
        name: String,
    },
    DeleteList {
        list_id: i64,
    },
    Attach {
        campaign_id: i64,
        list_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let args = Args::parse();

    let session = login(&args)?;
    let api = Arc::new(HttpCampaignApi::new(session));
    let (events, rx) = broadcast::channel(64);
    let printer = tokio::spawn(print_events(rx));

    let result = run(args.command, api, events).await;
    // Dropping the last sender ends the printer once it has drained.
    let _ = printer.await;
    result
}

fn login(args: &Args) -> Result<Session> {
    let session = Session::new(&args.server_url)?;
    Ok(match (&args.user, &args.password) {
        (Some(user), Some(password)) => session.with_basic_auth(user, password),
        (None, None) => session,
        _ => bail!("--user and --password must be given together"),
    })
}

async fn run(
    command: Command,
    api: Arc<HttpCampaignApi>,
    events: broadcast::Sender<ClientEvent>,
) -> Result<()> {
    match command {
        Command::Campaigns => {
            let flows = CampaignFlows::new(api, events);
            flows.refresh().await?;
            for campaign in flows.campaigns().await {
                println!(
                    "{:>6}  {:<40}  {}",
                    campaign.id.0, campaign.name, campaign.template_name
                );
            }
        }
        Command::CreateCampaign {
            name,
            template_name,
        } => {
            let flows = CampaignFlows::new(api, events);
            match flows.submit(CampaignForm { name, template_name }).await {
                CreateOutcome::Created(id) => println!("campaign_id={id}"),
                CreateOutcome::Invalid(errors) => {
                    for (field, message) in errors {
                        eprintln!("{field}: {message}");
                    }
                    bail!("campaign was not created");
                }
                CreateOutcome::Failed(_) | CreateOutcome::AlreadySubmitting => {
                    bail!("campaign was not created")
                }
            }
        }
        Command::DeleteCampaign { campaign_id } => {
            let flows = CampaignFlows::new(api, events);
            if let DeleteOutcome::Failed(_) = flows.delete(CampaignId(campaign_id)).await {
                bail!("campaign {campaign_id} was not deleted");
            }
        }
        Command::Templates => {
            let pager = TemplatePager::new(api, events);
            let mut step = pager.load_first().await?;
            while let PagerStep::Loaded { .. } = step {
                step = pager.load_more().await?;
            }
            for template in pager.templates().await {
                println!("{:>6}  {:<40}  {}", template.id.0, template.name, template.subject);
            }
        }
        Command::CreateList { name } => {
            let list = api.create_list(&NewList { name }).await?;
            println!("list_id={}", list.id);
        }
        Command::DeleteList { list_id } => {
            let deletion = api.delete_list(ListId(list_id)).await?;
            println!(
                "deleted list_id={} campaign_links={} subscriber_links={}",
                deletion.list_id, deletion.campaign_links, deletion.subscriber_links
            );
        }
        Command::Attach {
            campaign_id,
            list_id,
        } => {
            api.attach(CampaignId(campaign_id), ListId(list_id)).await?;
            println!("attached campaign_id={campaign_id} list_id={list_id}");
        }
    }
    Ok(())
}

async fn print_events(mut rx: broadcast::Receiver<ClientEvent>) {
    loop {
        match rx.recv().await {
            Ok(ClientEvent::Notify(Notification::Success(message))) => println!("{message}"),
            Ok(ClientEvent::Notify(Notification::Error(message))) => eprintln!("error: {message}"),
            Ok(ClientEvent::TemplatesLoaded { total, exhausted }) => {
                tracing::debug!(total, exhausted, "templates loaded");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "dropped dashboard events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
