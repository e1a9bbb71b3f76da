//! Feed refresher.
//!
//! Each reload mints a new generation and a cache-busted address. The view
//! starts the load at zero opacity and reports completion with the generation
//! it was given; only the newest generation is revealed.

use chrono::{DateTime, Utc};
use fallwatch_protocol::{NOCACHE_PARAM, VIDEO_FEED_PATH};
use reqwest::Url;
use serde::Serialize;

use crate::transport::endpoint_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FeedGeneration(u64);

impl FeedGeneration {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Instruction for the view: begin loading `url` hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLoad {
    pub generation: FeedGeneration,
    pub url: Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCompletion {
    /// Newest load finished; fade it in.
    Reveal(FeedGeneration),
    /// A newer refresh was issued after this load started.
    Stale {
        generation: FeedGeneration,
        latest: FeedGeneration,
    },
}

#[derive(Debug)]
pub struct FeedRefresher {
    feed_url: Url,
    latest: u64,
}

impl FeedRefresher {
    pub fn new(appliance_base: &Url) -> Self {
        Self {
            feed_url: endpoint_url(appliance_base, VIDEO_FEED_PATH),
            latest: 0,
        }
    }

    /// Feed address without a freshness token.
    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    pub fn latest(&self) -> Option<FeedGeneration> {
        (self.latest > 0).then_some(FeedGeneration(self.latest))
    }

    pub fn refresh(&mut self, now: DateTime<Utc>) -> FeedLoad {
        self.latest += 1;
        let generation = FeedGeneration(self.latest);
        let mut url = self.feed_url.clone();
        url.query_pairs_mut().append_pair(
            NOCACHE_PARAM,
            &format!("{}.{}", now.timestamp_millis(), generation.value()),
        );
        tracing::debug!(generation = generation.value(), url = %url, "Feed reload issued");
        FeedLoad { generation, url }
    }

    pub fn complete(&self, generation: FeedGeneration) -> FeedCompletion {
        if generation.value() == self.latest {
            tracing::debug!(generation = generation.value(), "Feed load revealed");
            FeedCompletion::Reveal(generation)
        } else {
            let latest = FeedGeneration(self.latest);
            tracing::debug!(
                generation = generation.value(),
                latest = latest.value(),
                "Discarding stale feed load"
            );
            FeedCompletion::Stale { generation, latest }
        }
    }
}
