use std::path::{Path, PathBuf};

use crate::crop::crop_match;
use crate::model::Summoner;
use crate::retry::{FetchError, RetryPolicy, retry_with_backoff};
use crate::riot_api::MatchApi;
use crate::store::MatchStore;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub region: String,
    pub queues: Vec<u32>,
    pub crop: bool,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub summoner: String,
    pub account_id: String,
    pub path: PathBuf,
    pub saved: usize,
    /// Indices whose match did not contain the summoner.
    pub skipped: usize,
}

pub struct MatchFetcher<'a, A: MatchApi + ?Sized> {
    api: &'a A,
    options: FetchOptions,
}

impl<'a, A: MatchApi + ?Sized> MatchFetcher<'a, A> {
    pub fn new(api: &'a A, options: FetchOptions) -> Self {
        Self { api, options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn resolve_account(&self, summoner: &Summoner) -> Result<String, FetchError> {
        let region = &self.options.region;
        retry_with_backoff(
            &self.options.retry,
            &format!("summoner lookup '{}'", summoner.name),
            |_| self.api.account_id(region, &summoner.name),
        )
    }

    /// Downloads every match of `summoner` into a fresh file at `path`.
    ///
    /// The match list is walked one index at a time. Each match is written as
    /// soon as it arrives. A match in which none of the summoner's names
    /// appear is logged and counted as skipped. When the retry policy gives
    /// up, the error is returned and everything saved so far stays on disk.
    pub fn fetch_summoner(
        &self,
        summoner: &Summoner,
        path: &Path,
    ) -> Result<FetchSummary, FetchError> {
        let account_id = self.resolve_account(summoner)?;
        self.fetch_account(summoner, &account_id, path)
    }

    pub fn fetch_account(
        &self,
        summoner: &Summoner,
        account_id: &str,
        path: &Path,
    ) -> Result<FetchSummary, FetchError> {
        let FetchOptions {
            region,
            queues,
            crop,
            retry,
        } = &self.options;
        let names = summoner.all_names();
        let mut store = MatchStore::create(path, &summoner.name)?;
        log::info!(
            "Retrieving matches of '{}' into '{}'",
            summoner.name,
            path.display()
        );

        let mut skipped = 0usize;
        let mut idx = 0u32;
        loop {
            let page = retry_with_backoff(retry, &format!("match list index {idx}"), |_| {
                self.api.match_list(region, account_id, queues, idx, idx + 1)
            })?;
            let Some(reference) = page.first() else {
                log::info!("Finished '{}' after {idx} match(es)", summoner.name);
                break;
            };

            let game_id = reference.game_id;
            let record = retry_with_backoff(retry, &format!("match {game_id}"), |_| {
                self.api.match_by_id(region, game_id)
            })?;

            let record = if *crop {
                match crop_match(&record, &names) {
                    Ok(cropped) => cropped,
                    Err(err) => {
                        log::warn!("Skipping match {game_id} (index {idx}): {err}");
                        skipped += 1;
                        idx += 1;
                        continue;
                    }
                }
            } else {
                record
            };

            store.append(&record)?;
            log::debug!("Saved match {idx:5} to '{}'", path.display());
            idx += 1;
        }

        Ok(FetchSummary {
            summoner: summoner.name.clone(),
            account_id: account_id.to_string(),
            path: path.to_path_buf(),
            saved: store.saved(),
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_api::FakeMatchApi;
    use crate::store::load_matches;

    fn options(crop: bool) -> FetchOptions {
        FetchOptions {
            region: "euw1".to_string(),
            queues: vec![450],
            crop,
            retry: RetryPolicy::immediate(3),
        }
    }

    #[test]
    fn rides_out_periodic_outages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_Foo.yml");
        let api = FakeMatchApi::new("Foo", 20, 0.5, 7).with_failures_every(4);
        let fetcher = MatchFetcher::new(&api, options(true));

        let summary = fetcher
            .fetch_summoner(&Summoner::new("Foo"), &path)
            .unwrap();
        assert_eq!(summary.saved, 20);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.account_id, "fake-foo");

        let stored = load_matches(&path).unwrap();
        assert_eq!(stored.matches.len(), 20);
        assert!(stored.matches.iter().all(|m| m.get("participantIdentities").is_none()));
    }

    #[test]
    fn keeps_full_records_when_not_cropping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_Foo.yml");
        let api = FakeMatchApi::new("Foo", 3, 0.5, 1);
        let fetcher = MatchFetcher::new(&api, options(false));

        let summary = fetcher
            .fetch_summoner(&Summoner::new("Foo"), &path)
            .unwrap();
        assert_eq!(summary.saved, 3);
        let stored = load_matches(&path).unwrap();
        assert!(stored.matches.iter().all(|m| m.get("participantIdentities").is_some()));
    }

    #[test]
    fn other_queues_yield_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_Foo.yml");
        let api = FakeMatchApi::new("Foo", 5, 0.5, 1).with_queue(420);
        let fetcher = MatchFetcher::new(&api, options(true));

        let summary = fetcher
            .fetch_summoner(&Summoner::new("Foo"), &path)
            .unwrap();
        assert_eq!(summary.saved, 0);
        assert!(path.is_file());
    }
}
