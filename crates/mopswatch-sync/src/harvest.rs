//! Sequential walk over a date range.
//!
//! One request in flight at a time: the portal is rate-limited and ties state
//! to the session cookie, so dates are queried strictly in order with a pause
//! after each one.

use std::time::Instant;

use mopswatch_core::{Aggregator, DateKey, RunResult};
use tracing::info;

use crate::retry::{DateOutcome, RetryController};
use crate::session::Credentials;
use crate::source::DisclosureSource;

/// Query every date, accumulate results, and return the normalised run result.
///
/// Failing dates never abort the run; they show up in [`RunResult::errors`].
pub async fn harvest<S>(
    source: &S,
    credentials: &Credentials,
    dates: &[DateKey],
    controller: &RetryController,
) -> RunResult
where
    S: DisclosureSource + ?Sized,
{
    let started = Instant::now();
    let mut aggregator = Aggregator::new();
    let total = dates.len();

    info!(dates = total, "harvest started");
    for (i, &date) in dates.iter().enumerate() {
        info!(date = %date, progress = %format!("{}/{}", i + 1, total), "querying");
        let date_started = Instant::now();

        let outcome = controller
            .run(date, || source.query(date, credentials))
            .await;
        let attempts = outcome.attempts();
        match outcome {
            DateOutcome::Succeeded { announcements, .. } => aggregator.add(date, announcements),
            DateOutcome::Exhausted { entry, .. } => aggregator.record_failure(date, entry),
        }
        info!(
            date = %date,
            attempts,
            elapsed_ms = date_started.elapsed().as_millis() as u64,
            "date finished"
        );

        controller.pause().await;
    }

    let result = aggregator.finalize();
    info!(
        elapsed_secs = started.elapsed().as_secs_f64(),
        collected = result.raw_count,
        unique = result.announcements.len(),
        failed = result.errors.len(),
        "harvest finished"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DelayRange, RetryPolicy};
    use crate::source::TransientFetchError;
    use async_trait::async_trait;
    use mopswatch_core::{Announcement, DisclosureDate};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted upstream: each date maps to a queue of responses; the last one repeats.
    struct ScriptedSource {
        script: Mutex<HashMap<DateKey, Vec<Result<Vec<Announcement>, TransientFetchError>>>>,
        calls: Mutex<Vec<DateKey>>,
    }

    impl ScriptedSource {
        fn new(
            entries: Vec<(DateKey, Vec<Result<Vec<Announcement>, TransientFetchError>>)>,
        ) -> Self {
            Self {
                script: Mutex::new(entries.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<DateKey> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DisclosureSource for ScriptedSource {
        async fn query(
            &self,
            date: DateKey,
            credentials: &Credentials,
        ) -> Result<Vec<Announcement>, TransientFetchError> {
            assert_eq!(credentials.get("JSESSIONID"), Some("abc"));
            self.calls.lock().unwrap().push(date);
            let mut script = self.script.lock().unwrap();
            let queue = script.entry(date).or_default();
            match queue.len() {
                0 => Ok(Vec::new()),
                1 => queue[0].clone(),
                _ => queue.remove(0),
            }
        }
    }

    fn key(day: u32) -> DateKey {
        DateKey::new(113, 1, day).unwrap()
    }

    fn ann(date: &str, code: &str, subject: &str) -> Announcement {
        Announcement {
            disclosure_date: DisclosureDate::Raw(date.into()),
            disclosure_time: "17:00:00".into(),
            company_code: code.into(),
            company_name: format!("company {code}"),
            subject: subject.into(),
        }
    }

    fn controller() -> RetryController {
        RetryController::new(RetryPolicy {
            max_attempts: 3,
            payload_backoff: DelayRange::fixed(Duration::ZERO),
            transport_backoff: DelayRange::fixed(Duration::ZERO),
            politeness_delay: Duration::ZERO,
        })
    }

    fn creds() -> Credentials {
        [("JSESSIONID", "abc")].into_iter().collect()
    }

    #[tokio::test]
    async fn keeps_partial_results_across_failures() {
        let source = ScriptedSource::new(vec![
            (key(1), vec![Ok(vec![ann("113/01/01", "1101", "A")])]),
            (key(2), vec![Err(TransientFetchError::ReadTimeout)]),
            (
                key(3),
                vec![
                    Err(TransientFetchError::Http(502)),
                    Ok(vec![ann("113/01/03", "2330", "B")]),
                ],
            ),
        ]);
        let dates = [key(1), key(2), key(3)];

        let result = harvest(&source, &creds(), &dates, &controller()).await;

        assert_eq!(result.dates_queried, 3);
        assert_eq!(result.announcements.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].date_label, "113-01-02");
        assert_eq!(result.errors[0].message, "ReadTimeout");
        assert_eq!(
            source.calls(),
            vec![key(1), key(2), key(2), key(2), key(3), key(3)]
        );
    }

    #[tokio::test]
    async fn deduplicates_across_dates() {
        let source = ScriptedSource::new(vec![
            (key(5), vec![Ok(vec![ann("113/01/05", "6666", "A")])]),
            (key(9), vec![Ok(vec![ann("113/01/09", "6666", "A"), ann("113/01/09", "7777", "C")])]),
        ]);
        let dates = [key(5), key(9)];

        let result = harvest(&source, &creds(), &dates, &controller()).await;

        assert_eq!(result.raw_count, 3);
        let summary: Vec<(String, String)> = result
            .announcements
            .iter()
            .map(|a| (a.disclosure_date.to_string(), a.subject.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("2024-01-05".to_string(), "A".to_string()),
                ("2024-01-09".to_string(), "C".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn every_date_failing_still_yields_a_result() {
        let source = ScriptedSource::new(vec![
            (key(1), vec![Err(TransientFetchError::ConnectTimeout)]),
            (key(2), vec![Err(TransientFetchError::Api(500))]),
        ]);
        let dates = [key(1), key(2)];

        let result = harvest(&source, &creds(), &dates, &controller()).await;

        assert!(result.announcements.is_empty());
        let messages: Vec<&str> = result.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["ConnectTimeout", "API returned code 500"]);
        assert_eq!(source.calls().len(), 6);
    }

    #[tokio::test]
    async fn empty_range_does_nothing() {
        let source = ScriptedSource::new(vec![]);
        let result = harvest(&source, &creds(), &[], &controller()).await;
        assert_eq!(result.dates_queried, 0);
        assert!(source.calls().is_empty());
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn harvests_against_http_upstream() {
        use crate::http::{MopsClient, QUERY_PATH};
        use serde_json::json;
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(body_partial_json(json!({ "day": "01" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "result": { "data": [
                    ["113/01/01", "17:30:00", "3008", "大立光", "代子公司公告董事會決議發行轉換公司債"],
                    ["113/01/01", "17:31:00", "3008", "大立光", "公告本公司取得資產"]
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(body_partial_json(json!({ "day": "02" })))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let client = MopsClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let result = harvest(&client, &creds(), &[key(1), key(2)], &controller()).await;

        assert_eq!(result.announcements.len(), 1);
        assert_eq!(result.announcements[0].company_code, "3008");
        assert_eq!(result.announcements[0].disclosure_date.to_string(), "2024-01-01");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].date_label, "113-01-02");
        assert_eq!(result.errors[0].message, "HTTP status 502");
    }

    #[tokio::test]
    async fn pauses_after_every_date() {
        let source = ScriptedSource::new(vec![]);
        let controller = RetryController::new(RetryPolicy {
            politeness_delay: Duration::from_millis(40),
            ..controller().policy().clone()
        });
        let dates = [key(1), key(2), key(3)];

        let start = Instant::now();
        harvest(&source, &creds(), &dates, &controller).await;
        assert!(start.elapsed() >= Duration::from_millis(120));
    }
}
