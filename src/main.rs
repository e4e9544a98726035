use anyhow::Result;
use clap::Parser;
use console::style;

use wp_static_sync::config::Config;
use wp_static_sync::github::GithubClient;
use wp_static_sync::images::ReqwestImageFetcher;
use wp_static_sync::sync::{self, SyncOutcome};
use wp_static_sync::wordpress::WordpressClient;

#[derive(Debug, Parser)]
#[command(author, version, about = "Sync WordPress posts to a static site's GitHub repo")]
struct Args {
    /// Report intended actions without writing to GitHub or deleting posts
    #[arg(long)]
    dry_run: bool,

    /// Keep the source posts in WordPress after a successful commit
    #[arg(long)]
    keep_posts: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = Config::from_env()?;
    cfg.dry_run |= args.dry_run;
    cfg.keep_posts |= args.keep_posts;

    let blog = WordpressClient::new(cfg.wordpress_endpoint.clone(), cfg.wordpress_token.clone());
    let repo = GithubClient::new(cfg.github_token.clone(), cfg.repository.clone());
    let fetcher = ReqwestImageFetcher::default();

    let outcome = sync::run(&cfg, &blog, &repo, &fetcher).await?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::NothingNew => println!("{}", style("Nothing new").blue()),
        SyncOutcome::NothingToPost => println!("{}", style("Nothing to post").blue()),
        SyncOutcome::Synced { report, .. } => {
            for line in report {
                if line.starts_with("Would") {
                    println!("{}", style(line).yellow());
                } else if line.starts_with("Sync'd") {
                    println!("{}", style(line).green());
                } else {
                    println!("{line}");
                }
            }
        }
    }
}
