//! List-view URL parameters
//!
//! Filter and pagination state round-trips through the URL bar, so the
//! page-objects navigate with these parameters rather than clicking controls
//! whenever the journey is not about the controls themselves.

use url::Url;

pub const OFFSET: &str = "offset";
pub const LIMIT: &str = "limit";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub state: Option<String>,
    pub run_id_pattern: Option<String>,
    pub task_state: Option<String>,
    pub job_state: Option<String>,
    pub job_type: Option<String>,
    pub connection_id_pattern: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn run_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.run_id_pattern = Some(pattern.into());
        self
    }

    pub fn task_state(mut self, state: impl Into<String>) -> Self {
        self.task_state = Some(state.into());
        self
    }

    pub fn job_state(mut self, state: impl Into<String>) -> Self {
        self.job_state = Some(state.into());
        self
    }

    pub fn job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self
    }

    pub fn connection_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.connection_id_pattern = Some(pattern.into());
        self
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = self.offset {
            pairs.push((OFFSET, v.to_string()));
        }
        if let Some(v) = self.limit {
            pairs.push((LIMIT, v.to_string()));
        }
        let text = [
            ("state", &self.state),
            ("run_id_pattern", &self.run_id_pattern),
            ("task_state", &self.task_state),
            ("job_state", &self.job_state),
            ("job_type", &self.job_type),
            ("connection_id_pattern", &self.connection_id_pattern),
        ];
        for (key, value) in text {
            if let Some(v) = value {
                pairs.push((key, v.clone()));
            }
        }
        pairs
    }

    /// Replace the query string of `url` with these parameters
    pub fn apply_to(&self, url: &mut Url) {
        let pairs = self.pairs();
        if pairs.is_empty() {
            url.set_query(None);
            return;
        }
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    pub fn from_url(url: &Url) -> Self {
        let mut query = Self::default();
        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            match key.as_ref() {
                OFFSET => query.offset = value.parse().ok(),
                LIMIT => query.limit = value.parse().ok(),
                "state" => query.state = Some(value),
                "run_id_pattern" => query.run_id_pattern = Some(value),
                "task_state" => query.task_state = Some(value),
                "job_state" => query.job_state = Some(value),
                "job_type" => query.job_type = Some(value),
                "connection_id_pattern" => query.connection_id_pattern = Some(value),
                _ => {}
            }
        }
        query
    }
}

/// Normalize "first page" to a single representation.
///
/// A URL carrying `limit` but no `offset` gets `offset=0` inserted ahead of the
/// other parameters. Returns `None` when the URL needs no change.
pub fn reconcile_pagination(url: &Url) -> Option<Url> {
    let mut has_limit = false;
    let mut has_offset = false;
    for (key, _) in url.query_pairs() {
        match key.as_ref() {
            LIMIT => has_limit = true,
            OFFSET => has_offset = true,
            _ => {}
        }
    }
    if !has_limit || has_offset {
        return None;
    }

    let rest: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut fixed = url.clone();
    {
        let mut pairs = fixed.query_pairs_mut();
        pairs.clear().append_pair(OFFSET, "0");
        pairs.extend_pairs(rest);
    }
    Some(fixed)
}

/// Value of query parameter `key`, if present
pub fn param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_apply_and_parse() {
        let mut target = url("http://ui.test/dags/demo/runs?stale=1");
        let query = ListQuery::new().limit(2).state("failed").run_id_pattern("manual");
        query.apply_to(&mut target);
        assert_eq!(
            target.as_str(),
            "http://ui.test/dags/demo/runs?limit=2&state=failed&run_id_pattern=manual"
        );
        assert_eq!(ListQuery::from_url(&target), query);
    }

    #[test]
    fn test_empty_query_clears_query_string() {
        let mut target = url("http://ui.test/connections?connection_id_pattern=abc");
        ListQuery::new().apply_to(&mut target);
        assert_eq!(target.as_str(), "http://ui.test/connections");
    }

    #[test]
    fn test_reconcile_inserts_offset() {
        let fixed = reconcile_pagination(&url("http://ui.test/dags/d/runs?limit=5&state=success")).unwrap();
        assert_eq!(fixed.as_str(), "http://ui.test/dags/d/runs?offset=0&limit=5&state=success");
        assert!(reconcile_pagination(&fixed).is_none());
    }

    #[test_case("http://ui.test/runs" ; "no parameters")]
    #[test_case("http://ui.test/runs?state=queued" ; "filter only")]
    #[test_case("http://ui.test/runs?offset=4&limit=2" ; "already paginated")]
    fn test_reconcile_leaves_url_alone(input: &str) {
        assert!(reconcile_pagination(&url(input)).is_none());
    }

    #[test]
    fn test_param_decodes() {
        let target = url("http://ui.test/runs?run_id_pattern=manual__2024-01-01T00%3A00");
        assert_eq!(param(&target, "run_id_pattern").as_deref(), Some("manual__2024-01-01T00:00"));
        assert_eq!(param(&target, "offset"), None);
    }
}
