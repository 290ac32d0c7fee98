use anyhow::Context;
use async_trait::async_trait;
use iplocbuild::{
    announce::{classify, Space},
    Config, Locations, Report, Route,
};

/// A source of routes learned by network devices.
#[async_trait]
pub(crate) trait Collect: Send + Sync {
    /// Fetch the routes known to `device` that carry every community in `communities`.
    async fn collect(&self, device: &str, communities: &[&str]) -> anyhow::Result<Vec<Route>>;
}

/// Communities marking provider aggregate and provider independent space.
#[derive(Debug, Clone)]
pub(crate) struct Communities {
    pub(crate) pa: String,
    pub(crate) pi: String,
}

/// Queries devices for every city, and reconciles the results against the allocation plan.
#[derive(Debug)]
pub(crate) struct Job<C> {
    collector: C,
    communities: Communities,
}

impl<C: Collect> Job<C> {
    pub(crate) fn new(collector: C, communities: Communities) -> Self {
        Self {
            collector,
            communities,
        }
    }

    /// Run every query, returning the reconciled address space of each city.
    ///
    /// Queries that fail are logged and skipped.
    #[tracing::instrument(skip_all, level = "debug")]
    pub(crate) async fn run(&self, config: &Config) -> anyhow::Result<Report> {
        let mut locations = Locations::new(config).context("invalid allocation plan")?;
        let pa_space = config.pa_space();
        for (name, city) in config.cities() {
            let (Some(community), Some(device)) = (city.community(), city.device()) else {
                tracing::debug!("no community or device configured for {name}, skipping");
                continue;
            };
            let queries = [
                (Space::Pa, self.communities.pa.as_str()),
                (Space::Pi, self.communities.pi.as_str()),
            ];
            for (space, space_community) in queries {
                tracing::info!("querying {device} for {name} ({space:?} community {space_community})");
                let routes = match self
                    .collector
                    .collect(device, &[community, space_community])
                    .await
                {
                    Ok(routes) => routes,
                    Err(err) => {
                        tracing::error!("failed to fetch routes for {name} from {device}: {err:#}");
                        continue;
                    }
                };
                if routes.is_empty() {
                    tracing::info!("no prefix found for {name} with communities {community} and {space_community}");
                    continue;
                }
                let announcements = classify(&routes, &pa_space, space);
                locations.apply(name, space, &announcements)?;
            }
        }
        Ok(locations.finish())
    }
}
