//! Node.js side of the bridge

pub(crate) const BRIDGE_SCRIPT: &str = r#"'use strict';
const readline = require('readline');
const playwright = require('playwright');

const pages = new Map();
const waiters = new Map();
let browser = null;
let seq = 0;

class BridgeError extends Error {
  constructor(kind, message) {
    super(message);
    this.kind = kind;
  }
}

function reply(msg) {
  process.stdout.write(JSON.stringify(msg) + '\n');
}

function pageFor(params) {
  const entry = pages.get(params.page);
  if (!entry) throw new BridgeError('other', `unknown page ${params.page}`);
  return entry.page;
}

function resolve(page, locator) {
  let scope = page;
  for (const step of locator.steps) {
    switch (step.by) {
      case 'css': scope = scope.locator(step.selector); break;
      case 'test_id': scope = scope.getByTestId(step.id); break;
      case 'role': scope = scope.getByRole(step.role, step.name ? { name: step.name } : {}); break;
      case 'text': scope = scope.getByText(step.text); break;
      case 'label': scope = scope.getByLabel(step.text); break;
      case 'placeholder': scope = scope.getByPlaceholder(step.text); break;
      case 'has_text': scope = scope.filter({ hasText: step.text }); break;
      case 'nth': scope = scope.nth(step.index); break;
      case 'first': scope = scope.first(); break;
      case 'last': scope = scope.last(); break;
      default: throw new BridgeError('other', `unknown locator step ${step.by}`);
    }
  }
  return scope;
}

async function existing(params) {
  const loc = resolve(pageFor(params), params.locator);
  if ((await loc.count()) === 0) throw new BridgeError('not_found', 'no element matches');
  return loc.first();
}

function target(params) {
  return resolve(pageFor(params), params.locator).first();
}

const handlers = {
  async launch({ browser: name, headless }) {
    const type = playwright[name];
    if (!type) throw new BridgeError('other', `unknown browser ${name}`);
    browser = await type.launch({ headless });
    return { version: browser.version() };
  },
  async new_page({ base_url, viewport }) {
    if (!browser) throw new BridgeError('other', 'browser not launched');
    const context = await browser.newContext({ baseURL: base_url, viewport });
    const page = await context.newPage();
    const id = `p${++seq}`;
    pages.set(id, { context, page });
    return { page: id };
  },
  async close_page({ page }) {
    const entry = pages.get(page);
    if (entry) {
      pages.delete(page);
      for (const [id, waiter] of waiters) {
        if (waiter.page === page) waiters.delete(id);
      }
      await entry.context.close();
    }
    return null;
  },
  async goto(p) {
    await pageFor(p).goto(p.url, { timeout: p.timeout, waitUntil: 'domcontentloaded' });
    return null;
  },
  async url(p) { return pageFor(p).url(); },
  async count(p) { return resolve(pageFor(p), p.locator).count(); },
  async visible(p) {
    const loc = resolve(pageFor(p), p.locator);
    if ((await loc.count()) === 0) return false;
    return loc.first().isVisible();
  },
  async text(p) { return (await existing(p)).innerText(); },
  async texts(p) { return resolve(pageFor(p), p.locator).allInnerTexts(); },
  async attribute(p) { return (await existing(p)).getAttribute(p.name); },
  async input_value(p) { return (await existing(p)).inputValue(); },
  async click(p) { await target(p).click({ timeout: p.timeout }); return null; },
  async fill(p) { await target(p).fill(p.value, { timeout: p.timeout }); return null; },
  async press(p) { await target(p).press(p.key, { timeout: p.timeout }); return null; },
  async select(p) { await target(p).selectOption(p.value, { timeout: p.timeout }); return null; },
  async expect_response(p) {
    const method = p.method.toUpperCase();
    const matchesUrl = (url) => p.path_end
      ? url.split(/[?#]/)[0].endsWith(p.url_contains)
      : url.includes(p.url_contains);
    const promise = pageFor(p).waitForResponse(
      (r) => r.request().method() === method && matchesUrl(r.url()),
      { timeout: p.timeout },
    );
    const id = `w${++seq}`;
    // A waiter nobody claims (the action failed first) is dropped one
    // timeout after it settles
    const expire = () => { setTimeout(() => waiters.delete(id), p.timeout); };
    promise.then(expire, expire);
    waiters.set(id, { page: p.page, promise });
    return { waiter: id };
  },
  async await_response(p) {
    const entry = waiters.get(p.waiter);
    if (!entry) throw new BridgeError('other', `unknown or expired waiter ${p.waiter}`);
    waiters.delete(p.waiter);
    const response = await entry.promise;
    let body = '';
    try { body = await response.text(); } catch (_) { body = ''; }
    return {
      status: response.status(),
      method: response.request().method(),
      url: response.url(),
      body,
    };
  },
  async screenshot(p) {
    await pageFor(p).screenshot({ path: p.path, fullPage: true });
    return null;
  },
  async shutdown() {
    for (const { context } of pages.values()) await context.close().catch(() => {});
    pages.clear();
    if (browser) await browser.close();
    browser = null;
    setTimeout(() => process.exit(0), 50);
    return null;
  },
};

function classify(err) {
  const message = String((err && err.message) || err);
  if (err && err.kind) return { kind: err.kind, message };
  if (err && err.name === 'TimeoutError') return { kind: 'timeout', message };
  return { kind: 'other', message };
}

const rl = readline.createInterface({ input: process.stdin });
rl.on('line', async (line) => {
  if (!line.trim()) return;
  let req;
  try {
    req = JSON.parse(line);
  } catch (_) {
    process.stderr.write(`unparseable request: ${line}\n`);
    return;
  }
  try {
    const handler = handlers[req.method];
    if (!handler) throw new BridgeError('other', `unknown method ${req.method}`);
    const result = await handler(req.params || {});
    reply({ id: req.id, ok: true, result: result === undefined ? null : result });
  } catch (err) {
    reply({ id: req.id, ok: false, error: classify(err) });
  }
});
rl.on('close', async () => {
  if (browser) await browser.close().catch(() => {});
  process.exit(0);
});
"#;
