//! In-memory driver for unit-testing page-objects
//!
//! `FakeDriver` models a single-page app: the DOM is a pure function of the
//! current URL (`render`), and click/fill handlers mutate app data, navigate,
//! and emit network responses. Locators are resolved against the rendered
//! tree the same way the bridge resolves them in a browser, so every query
//! sees the DOM as of that moment.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

use crate::config::Timeouts;
use crate::driver::{CapturedResponse, Driver, ResponseMatcher, ResponseWaiter};
use crate::error::{E2eError, E2eResult};
use crate::locator::{Locator, Step};
use crate::page::Page;

pub const BASE_URL: &str = "http://airflow.test/";

/// Timeouts short enough that a failing expectation fails fast
pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        action_ms: 100,
        expect_ms: 300,
        navigation_ms: 100,
        response_ms: 300,
        settle_delay_ms: 1,
        poll_intervals_ms: vec![5],
    }
}

pub fn fake_page(driver: Arc<FakeDriver>) -> Page {
    Page::new(driver, BASE_URL, fast_timeouts()).expect("static base url")
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: String,
    pub selectors: Vec<String>,
    pub test_id: Option<String>,
    pub role: Option<String>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub text: String,
    pub value: String,
    pub attrs: HashMap<String, String>,
    pub hidden: bool,
    pub key: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    pub fn test_id(mut self, id: &str) -> Self {
        self.test_id = Some(id.to_string());
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn hidden_if(self, hidden: bool) -> Self {
        if hidden {
            self.hidden()
        } else {
            self
        }
    }

    /// Handler key looked up on click/fill
    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    fn matches_css_token(&self, token: &str) -> bool {
        self.tag == token || self.selectors.iter().any(|s| s == token)
    }

    fn full_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(self.text.clone());
        }
        for child in &self.children {
            let t = child.full_text();
            if !t.is_empty() {
                parts.push(t);
            }
        }
        parts.join(" ")
    }

    fn accessible_name(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.full_text())
    }
}

pub fn button(name: &str, key: &str) -> Node {
    Node::new("button").role("button").label(name).text(name).key(key)
}

pub fn cell(text: &str) -> Node {
    Node::new("td").text(text)
}

pub fn badge(state: &str) -> Node {
    Node::new("span").test_id("state-badge").text(state)
}

/// `[data-testid="table-list"]` with a header row and one `tr` per row
pub fn table(headers: &[&str], rows: Vec<Vec<Node>>) -> Node {
    let header = Node::new("tr").children(headers.iter().map(|h| Node::new("th").text(h)));
    let body = Node::new("tbody").children(
        rows.into_iter()
            .map(|cells| Node::new("tr").children(cells)),
    );
    Node::new("table")
        .test_id("table-list")
        .child(Node::new("thead").child(header))
        .child(body)
}

pub fn pagination(has_prev: bool, has_next: bool) -> Node {
    let mut prev = button("previous page", "prev-page");
    if !has_prev {
        prev = prev.hidden();
    }
    let mut next = button("next page", "next-page");
    if !has_next {
        next = next.hidden();
    }
    Node::new("nav").child(prev).child(next)
}

type NodePath = Vec<usize>;

fn node_at<'a>(root: &'a Node, path: &[usize]) -> &'a Node {
    path.iter().fold(root, |node, i| &node.children[*i])
}

fn node_at_mut<'a>(root: &'a mut Node, path: &[usize]) -> &'a mut Node {
    path.iter().fold(root, |node, i| &mut node.children[*i])
}

fn descendants(root: &Node, from: &[usize], out: &mut Vec<NodePath>) {
    let node = node_at(root, from);
    for i in 0..node.children.len() {
        let mut path = from.to_vec();
        path.push(i);
        out.push(path.clone());
        descendants(root, &path, out);
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn resolve(root: &Node, locator: &Locator) -> Vec<NodePath> {
    let mut set: Vec<NodePath> = vec![vec![]];

    let search = |set: &[NodePath], pred: &dyn Fn(&Node) -> bool| -> Vec<NodePath> {
        let mut found: Vec<NodePath> = Vec::new();
        for scope in set {
            let mut all = Vec::new();
            descendants(root, scope, &mut all);
            for path in all {
                if pred(node_at(root, &path)) && !found.contains(&path) {
                    found.push(path);
                }
            }
        }
        found
    };

    for step in locator.steps() {
        set = match step {
            Step::Css { selector } => {
                let mut current = set;
                for token in selector.split_whitespace() {
                    current = search(&current, &|n: &Node| n.matches_css_token(token));
                }
                current
            }
            Step::TestId { id } => search(&set, &|n: &Node| n.test_id.as_deref() == Some(id.as_str())),
            Step::Role { role, name } => search(&set, &|n: &Node| {
                n.role.as_deref() == Some(role.as_str())
                    && name
                        .as_deref()
                        .map(|name| contains_ci(&n.accessible_name(), name))
                        .unwrap_or(true)
            }),
            Step::Text { text } => search(&set, &|n: &Node| !n.text.is_empty() && contains_ci(&n.text, text)),
            Step::Label { text } => search(&set, &|n: &Node| {
                n.label.as_deref().map(|l| contains_ci(l, text)).unwrap_or(false)
            }),
            Step::Placeholder { text } => search(&set, &|n: &Node| {
                n.placeholder.as_deref().map(|p| contains_ci(p, text)).unwrap_or(false)
            }),
            Step::HasText { text } => set
                .into_iter()
                .filter(|p| contains_ci(&node_at(root, p).full_text(), text))
                .collect(),
            Step::Nth { index } => set.into_iter().nth(*index).into_iter().collect(),
            Step::First => set.into_iter().take(1).collect(),
            Step::Last => set.into_iter().last().into_iter().collect(),
        };
    }
    set
}

type Render = Arc<dyn Fn(&Url) -> Node + Send + Sync>;
type ClickHandler = Box<dyn FnMut(&mut FakeState) + Send>;
type FillHandler = Box<dyn FnMut(&mut FakeState, &str) + Send>;

pub struct FakeState {
    pub url: Url,
    pub root: Node,
    pub responses: Vec<CapturedResponse>,
    pub visits: Vec<String>,
    pub clicks: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    render: Render,
}

impl FakeState {
    /// Re-render the app at `url`
    pub fn navigate(&mut self, url: Url) {
        self.root = (self.render)(&url);
        self.url = url;
    }

    /// Relative navigation, e.g. `"/connections?offset=0"`
    pub fn navigate_to(&mut self, path: &str) {
        if let Ok(url) = self.url.join(path) {
            self.navigate(url);
        }
    }

    /// Re-render in place, for handlers that changed app data
    pub fn refresh(&mut self) {
        let url = self.url.clone();
        self.navigate(url);
    }

    pub fn respond(&mut self, method: &str, path: &str, status: u16, body: &str) {
        self.responses.push(CapturedResponse {
            status,
            method: method.to_string(),
            url: format!("{}{}", BASE_URL.trim_end_matches('/'), path),
            body: body.to_string(),
        });
    }
}

struct Inner {
    state: FakeState,
    on_click: HashMap<String, ClickHandler>,
    on_fill: HashMap<String, FillHandler>,
    waiters: HashMap<String, (ResponseMatcher, usize)>,
    next_waiter: u64,
    closed: bool,
}

pub struct FakeDriver {
    inner: Mutex<Inner>,
}

impl FakeDriver {
    pub fn new<R>(render: R) -> Arc<Self>
    where
        R: Fn(&Url) -> Node + Send + Sync + 'static,
    {
        let render: Render = Arc::new(render);
        let url = Url::parse("about:blank").expect("static url");
        Arc::new(Self {
            inner: Mutex::new(Inner {
                state: FakeState {
                    root: Node::new("html"),
                    url,
                    responses: Vec::new(),
                    visits: Vec::new(),
                    clicks: Vec::new(),
                    screenshots: Vec::new(),
                    render,
                },
                on_click: HashMap::new(),
                on_fill: HashMap::new(),
                waiters: HashMap::new(),
                next_waiter: 0,
                closed: false,
            }),
        })
    }

    pub fn on_click<H>(&self, key: &str, handler: H)
    where
        H: FnMut(&mut FakeState) + Send + 'static,
    {
        self.inner
            .lock()
            .on_click
            .insert(key.to_string(), Box::new(handler));
    }

    pub fn on_fill<H>(&self, key: &str, handler: H)
    where
        H: FnMut(&mut FakeState, &str) + Send + 'static,
    {
        self.inner
            .lock()
            .on_fill
            .insert(key.to_string(), Box::new(handler));
    }

    pub fn visits(&self) -> Vec<String> {
        self.inner.lock().state.visits.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.inner.lock().state.clicks.clone()
    }

    pub fn url(&self) -> String {
        self.inner.lock().state.url.to_string()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.inner.lock().state.screenshots.clone()
    }

    fn first_actionable(inner: &Inner, locator: &Locator, timeout: Duration) -> E2eResult<NodePath> {
        resolve(&inner.state.root, locator)
            .into_iter()
            .find(|p| !node_at(&inner.state.root, p).hidden)
            .ok_or_else(|| E2eError::timeout(format!("{} to be actionable", locator), timeout))
    }

    fn check_open(inner: &Inner) -> E2eResult<()> {
        if inner.closed {
            return Err(E2eError::Playwright("Target page has been closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn goto(&self, url: &str, _timeout: Duration) -> E2eResult<()> {
        let mut inner = self.inner.lock();
        Self::check_open(&inner)?;
        let url = Url::parse(url)?;
        inner.state.visits.push(url.to_string());
        inner.state.navigate(url);
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        let inner = self.inner.lock();
        Self::check_open(&inner)?;
        Ok(inner.state.url.to_string())
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let inner = self.inner.lock();
        Self::check_open(&inner)?;
        Ok(resolve(&inner.state.root, locator).len())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let inner = self.inner.lock();
        Self::check_open(&inner)?;
        Ok(resolve(&inner.state.root, locator)
            .first()
            .map(|p| !node_at(&inner.state.root, p).hidden)
            .unwrap_or(false))
    }

    async fn text(&self, locator: &Locator) -> E2eResult<String> {
        let inner = self.inner.lock();
        Self::check_open(&inner)?;
        resolve(&inner.state.root, locator)
            .first()
            .map(|p| node_at(&inner.state.root, p).full_text())
            .ok_or_else(|| E2eError::ElementNotFound(locator.to_string()))
    }

    async fn all_texts(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        let inner = self.inner.lock();
        Self::check_open(&inner)?;
        Ok(resolve(&inner.state.root, locator)
            .iter()
            .map(|p| node_at(&inner.state.root, p).full_text())
            .collect())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let inner = self.inner.lock();
        Self::check_open(&inner)?;
        resolve(&inner.state.root, locator)
            .first()
            .map(|p| node_at(&inner.state.root, p).attrs.get(name).cloned())
            .ok_or_else(|| E2eError::ElementNotFound(locator.to_string()))
    }

    async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        let inner = self.inner.lock();
        Self::check_open(&inner)?;
        resolve(&inner.state.root, locator)
            .first()
            .map(|p| node_at(&inner.state.root, p).value.clone())
            .ok_or_else(|| E2eError::ElementNotFound(locator.to_string()))
    }

    async fn click(&self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        let mut guard = self.inner.lock();
        Self::check_open(&guard)?;
        let path = Self::first_actionable(&guard, locator, timeout)?;
        let key = node_at(&guard.state.root, &path).key.clone();

        let Inner { state, on_click, .. } = &mut *guard;
        state.clicks.push(key.clone().unwrap_or_else(|| locator.to_string()));
        if let Some(handler) = key.as_ref().and_then(|k| on_click.get_mut(k)) {
            handler(state);
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str, timeout: Duration) -> E2eResult<()> {
        let mut guard = self.inner.lock();
        Self::check_open(&guard)?;
        let path = Self::first_actionable(&guard, locator, timeout)?;

        let Inner { state, on_fill, .. } = &mut *guard;
        let node = node_at_mut(&mut state.root, &path);
        node.value = value.to_string();
        let key = node.key.clone();
        if let Some(handler) = key.as_ref().and_then(|k| on_fill.get_mut(k)) {
            handler(state, value);
        }
        Ok(())
    }

    async fn press(&self, locator: &Locator, _key: &str, timeout: Duration) -> E2eResult<()> {
        let guard = self.inner.lock();
        Self::check_open(&guard)?;
        Self::first_actionable(&guard, locator, timeout).map(|_| ())
    }

    async fn select_option(
        &self,
        locator: &Locator,
        value: &str,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.fill(locator, value, timeout).await
    }

    async fn expect_response(
        &self,
        matcher: ResponseMatcher,
        timeout: Duration,
    ) -> E2eResult<ResponseWaiter> {
        let mut inner = self.inner.lock();
        Self::check_open(&inner)?;
        inner.next_waiter += 1;
        let id = format!("w{}", inner.next_waiter);
        let seen = inner.state.responses.len();
        inner.waiters.insert(id.clone(), (matcher.clone(), seen));
        Ok(ResponseWaiter {
            id,
            matcher,
            timeout,
        })
    }

    async fn await_response(&self, waiter: ResponseWaiter) -> E2eResult<CapturedResponse> {
        let start = Instant::now();
        loop {
            {
                let mut inner = self.inner.lock();
                let (matcher, seen) = inner
                    .waiters
                    .get(&waiter.id)
                    .cloned()
                    .ok_or_else(|| E2eError::Playwright(format!("unknown waiter {}", waiter.id)))?;
                let found = inner.state.responses[seen..]
                    .iter()
                    .find(|r| matcher.matches(&r.method, &r.url))
                    .cloned();
                if let Some(response) = found {
                    inner.waiters.remove(&waiter.id);
                    return Ok(response);
                }
            }
            if start.elapsed() >= waiter.timeout {
                self.inner.lock().waiters.remove(&waiter.id);
                return Err(E2eError::timeout(
                    format!("response {}", waiter.matcher),
                    start.elapsed(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.inner.lock().state.screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        self.inner.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> Arc<FakeDriver> {
        FakeDriver::new(|_url| {
            Node::new("html").child(table(
                &["Connection ID", "Type"],
                vec![
                    vec![cell("pg_main"), cell("postgres")],
                    vec![cell("s3_logs"), cell("aws")],
                ],
            ))
        })
    }

    #[tokio::test]
    async fn test_resolution_matches_browser_semantics() {
        let driver = app();
        driver.goto(BASE_URL, Duration::ZERO).await.unwrap();

        let rows = Locator::by_test_id("table-list").locator("tbody tr");
        assert_eq!(driver.count(&rows).await.unwrap(), 2);
        assert_eq!(
            driver.text(&rows.filter_has_text("S3_").locator("td").first()).await.unwrap(),
            "s3_logs"
        );
        assert_eq!(
            driver.all_texts(&Locator::css("thead th")).await.unwrap(),
            vec!["Connection ID", "Type"]
        );
        assert!(matches!(
            driver.text(&rows.nth(5)).await,
            Err(E2eError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_form_fields_by_label_and_placeholder() {
        let driver = FakeDriver::new(|_| {
            Node::new("form").children(vec![
                Node::new("input").label("Host").value("db.internal").attr("name", "host"),
                Node::new("input").placeholder("Search Connections").attr("type", "search"),
            ])
        });
        let page = fake_page(driver.clone());
        page.goto("/connections").await.unwrap();

        let host = Locator::by_label("host");
        assert_eq!(page.input_value(&host).await.unwrap(), "db.internal");
        assert_eq!(driver.attribute(&host, "name").await.unwrap().as_deref(), Some("host"));
        assert_eq!(driver.attribute(&host, "maxlength").await.unwrap(), None);

        let search = Locator::by_placeholder("search connections");
        page.fill(&search, "aws").await.unwrap();
        assert_eq!(page.input_value(&search).await.unwrap(), "aws");
        assert_eq!(driver.attribute(&search, "type").await.unwrap().as_deref(), Some("search"));

        assert!(matches!(
            driver.attribute(&Locator::by_label("Port"), "name").await,
            Err(E2eError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_response_waiter_ignores_earlier_responses() {
        let driver = app();
        driver.goto(BASE_URL, Duration::ZERO).await.unwrap();
        driver.inner.lock().state.respond("POST", "/api/v2/connections", 201, "{\"old\":true}");

        let waiter = driver
            .expect_response(ResponseMatcher::post("/api/v2/connections"), Duration::from_millis(50))
            .await
            .unwrap();
        let err = driver.await_response(waiter).await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout { .. }));
    }
}
