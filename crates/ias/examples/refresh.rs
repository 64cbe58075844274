use std::{env, error::Error, time::Duration};

use ias::{AppStore, IasConfig, IasEvent, IasService};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::default()
                // Override via `RUST_LOG=...`
                // (e.g. `ias=trace,ias_catalog=debug,ias_assets=debug,ias_net=info`)
                .add_directive("ias=debug".parse()?)
                .add_directive("ias_catalog=debug".parse()?)
                .add_directive("ias_assets=debug".parse()?)
                .add_directive("ias_net=info".parse()?),
        )
        .init();

    let data_dir = env::temp_dir().join("ias-demo");
    let config = IasConfig::new(AppStore::GooglePlay, "com.pickle.demo", &data_dir);
    let service = IasService::new(config)?;

    let mut events = service.events();
    service.start();

    // Watch one refresh cycle, then show what slot 1 has for us.
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(IasEvent::DataReady) => tracing::info!("catalog ready"),
                Ok(IasEvent::ImageReady { slot }) => {
                    let ready = service.is_ad_ready(slot, 0);
                    let url = service.ad_url(slot, 0);
                    tracing::info!(slot, ready, ?url, "image ready");
                    if slot == 1 && ready {
                        break;
                    }
                }
                Ok(IasEvent::ForceChangeWanted { slot }) => {
                    tracing::info!(slot, "force change wanted");
                }
                Ok(IasEvent::Error { error, recoverable }) => {
                    tracing::warn!(error, recoverable, "engine error");
                    if !recoverable {
                        break;
                    }
                }
                Err(_) => break,
            },
            () = tokio::time::sleep(Duration::from_secs(30)) => {
                tracing::warn!("timed out waiting for adverts");
                break;
            }
        }
    }

    if let Some(package) = service.ad_package_name(1, 0) {
        tracing::info!(package, "active advert for slot 1");
    }

    service.shutdown()?;
    Ok(())
}
