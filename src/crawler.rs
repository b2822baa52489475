//! Article discovery.
//!
//! A [`Crawler`] is built fresh for each run and owns all discovery state: the
//! listing-page queue, the pages already visited, the set of article URLs seen
//! so far and the links discovered in order. It moves through
//! [`DiscoveryState::Seeding`], [`DiscoveryState::Discovering`] and
//! [`DiscoveryState::Done`] and never leaves `Done`.
//!
//! Discovery is sequential: whether another listing page is worth fetching
//! depends on how many articles the previous pages yielded.

use std::collections::{HashSet, VecDeque};

use encoding_rs::Encoding;
use scraper::Html;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::RunConfig;
use crate::fetcher::Fetch;
use crate::models::DiscoveredLink;
use crate::scrapers::PageSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Seeding,
    Discovering,
    Done,
}

pub struct Crawler<'a, F> {
    fetcher: &'a F,
    schema: &'a dyn PageSchema,
    encoding: &'static Encoding,
    seeds: Vec<Url>,
    host: Option<String>,
    target: usize,
    deadline: Option<Instant>,
    state: DiscoveryState,
    queue: VecDeque<Url>,
    visited_pages: HashSet<Url>,
    seen: HashSet<Url>,
    links: Vec<DiscoveredLink>,
}

impl<'a, F> Crawler<'a, F>
where
    F: Fetch,
{
    pub fn new(config: &RunConfig, fetcher: &'a F, schema: &'a dyn PageSchema) -> Self {
        let seeds = config.seed_urls().to_vec();
        let host = seeds.first().and_then(Url::host_str).map(str::to_owned);
        Self {
            fetcher,
            schema,
            encoding: config.encoding(),
            seeds,
            host,
            target: config.total_articles(),
            deadline: None,
            state: DiscoveryState::Seeding,
            queue: VecDeque::new(),
            visited_pages: HashSet::new(),
            seen: HashSet::new(),
            links: Vec::new(),
        }
    }

    /// Stop discovering once `deadline` passes, checked between pages.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Links discovered so far, in discovery order.
    pub fn discovered(&self) -> &[DiscoveredLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<DiscoveredLink> {
        self.links
    }

    /// Run discovery until the target count is reached, the queue runs dry
    /// or the deadline passes.
    ///
    /// # Returns
    ///
    /// The discovered links in discovery order, at most the configured target
    /// count, with identifiers `1..=N`. Calling it again after discovery is
    /// `Done` returns the same links without fetching anything.
    #[instrument(level = "info", skip_all, fields(site = self.schema.site(), target = self.target))]
    pub async fn find_articles(&mut self) -> &[DiscoveredLink] {
        while self.state != DiscoveryState::Done {
            self.step().await;
        }
        info!(
            count = self.links.len(),
            pages = self.visited_pages.len(),
            "Discovery finished"
        );
        &self.links
    }

    /// Advance the state machine by one transition.
    pub async fn step(&mut self) -> DiscoveryState {
        match self.state {
            DiscoveryState::Seeding => {
                self.seen.clear();
                self.queue = self.seeds.iter().cloned().collect();
                self.state = DiscoveryState::Discovering;
            }
            DiscoveryState::Discovering => {
                if self.links.len() >= self.target {
                    debug!("Target article count reached");
                    self.state = DiscoveryState::Done;
                } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
                    warn!(count = self.links.len(), "Discovery deadline passed");
                    self.state = DiscoveryState::Done;
                } else if let Some(page_url) = self.queue.pop_front() {
                    self.visit(page_url).await;
                } else {
                    debug!("Listing queue exhausted");
                    self.state = DiscoveryState::Done;
                }
            }
            DiscoveryState::Done => {}
        }
        self.state
    }

    #[instrument(level = "info", skip_all, fields(url = %page_url))]
    async fn visit(&mut self, page_url: Url) {
        if !self.visited_pages.insert(page_url.clone()) {
            return;
        }
        match self.fetcher.fetch(&page_url).await {
            Ok(page) => {
                // relative links resolve against where the redirects ended
                if page.url != page_url {
                    debug!(final_url = %page.url, "Listing page redirected");
                    self.visited_pages.insert(page.url.clone());
                }
                let html = page.text(self.encoding);
                self.absorb(&page.url, &html);
            }
            Err(failure) => {
                warn!(error = %failure, "Listing page fetch failed; skipping");
            }
        }
    }

    /// Record new article links from a fetched listing page and queue its
    /// pagination while still short of the target.
    fn absorb(&mut self, page_url: &Url, html: &str) {
        let document = Html::parse_document(html);
        let before = self.links.len();

        for url in self.schema.article_links(&document, page_url) {
            if self.links.len() >= self.target {
                break;
            }
            if !self.is_on_site(&url) || self.visited_pages.contains(&url) || self.seeds.contains(&url) {
                continue;
            }
            if self.seen.insert(url.clone()) {
                let id = self.links.len() + 1;
                debug!(id, %url, "Discovered article");
                self.links.push(DiscoveredLink { id, url });
            }
        }

        if self.links.len() < self.target {
            for next in self.schema.pagination_links(&document, page_url) {
                if self.is_on_site(&next)
                    && !self.visited_pages.contains(&next)
                    && !self.queue.contains(&next)
                {
                    debug!(url = %next, "Queued listing page");
                    self.queue.push_back(next);
                }
            }
        }

        info!(
            new = self.links.len() - before,
            total = self.links.len(),
            queued = self.queue.len(),
            "Indexed listing page"
        );
    }

    fn is_on_site(&self, url: &Url) -> bool {
        match &self.host {
            Some(host) => url.host_str() == Some(host.as_str()),
            None => true,
        }
    }
}
