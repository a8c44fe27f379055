//! quill-preview: the render pipeline between the editor and the pane.
//!
//! [`Previewer`] debounces render requests (trailing edge, re-armed on
//! every call), skips work when the content has not changed, and runs a
//! chain of [`PostProcessor`] hooks over the parser's HTML. Scroll
//! position mapping between the editor and the preview lives in
//! [`scroll`].

pub mod scroll;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quill_markdown::{MarkdownParser, ParserConfig};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Trailing-edge debounce window for [`Previewer::render`].
pub const DEBOUNCE: Duration = Duration::from_millis(150);

/// A hook that rewrites rendered HTML after parsing.
///
/// Processors run in registration order. A hook whose feature is not
/// wired up implements this on `()` and the slot costs nothing.
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &'static str;
    fn process(&self, html: &mut String);
}

/// The absent processor: does nothing, silently.
impl PostProcessor for () {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn process(&self, _html: &mut String) {}
}

/// Inserts a copy button ahead of every fenced code block. The button
/// is inert markup here; the host UI attaches the click handler.
pub struct CopyButtonHook;

impl PostProcessor for CopyButtonHook {
    fn name(&self) -> &'static str {
        "copy-button"
    }

    fn process(&self, html: &mut String) {
        // Rendered code blocks open with `<pre data-source-line=...>`;
        // match the prefix, not a bare `<pre>`.
        if !html.contains("<pre") {
            return;
        }
        *html = html.replace(
            "<pre ",
            "<button class=\"copy-code\" type=\"button\">Copy</button><pre ",
        );
    }
}

/// Marks fenced code blocks as pending highlight so the host's
/// highlighter can find them in one query.
pub struct HighlightHook;

impl PostProcessor for HighlightHook {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn process(&self, html: &mut String) {
        *html = html.replace("<code class=\"language-", "<code data-highlight=\"pending\" class=\"language-");
    }
}

/// Marks mermaid containers for the host's diagram renderer.
pub struct MermaidHook;

impl PostProcessor for MermaidHook {
    fn name(&self) -> &'static str {
        "mermaid"
    }

    fn process(&self, html: &mut String) {
        *html = html.replace(
            "<div class=\"mermaid\"",
            "<div class=\"mermaid\" data-diagram=\"pending\"",
        );
    }
}

/// Outcome of one debounced render request.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Content changed; carries the fresh post-processed HTML.
    Rendered(String),
    /// Content identical to the last render; nothing was done.
    Unchanged,
    /// A newer request arrived inside the debounce window; this one was
    /// discarded without rendering.
    Superseded,
}

struct PreviewState {
    last_source: Option<String>,
    html: String,
}

struct Inner {
    parser: MarkdownParser,
    processors: Vec<Box<dyn PostProcessor>>,
    state: Mutex<PreviewState>,
    generation: AtomicU64,
}

#[derive(Clone)]
pub struct Previewer {
    inner: Arc<Inner>,
}

impl Default for Previewer {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl Previewer {
    pub fn new(config: ParserConfig) -> Self {
        Self::with_processors(
            config,
            vec![
                Box::new(HighlightHook),
                Box::new(MermaidHook),
                Box::new(CopyButtonHook),
            ],
        )
    }

    pub fn with_processors(config: ParserConfig, processors: Vec<Box<dyn PostProcessor>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                parser: MarkdownParser::new(config),
                processors,
                state: Mutex::new(PreviewState {
                    last_source: None,
                    html: String::new(),
                }),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Request a render of `content`, debounced on the trailing edge.
    ///
    /// Every call re-arms the window; only the call that is still the
    /// newest when the window elapses actually renders. A discarded
    /// request returns [`RenderOutcome::Superseded`] and touches no
    /// state. When the surviving content equals the previous render's
    /// source, the request is a no-op ([`RenderOutcome::Unchanged`]).
    pub async fn render(&self, content: &str) -> RenderOutcome {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(DEBOUNCE).await;
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return RenderOutcome::Superseded;
        }

        let mut state = self.inner.state.lock().await;
        if state.last_source.as_deref() == Some(content) {
            return RenderOutcome::Unchanged;
        }

        let html = self.do_render(content);
        state.last_source = Some(content.to_string());
        state.html = html.clone();
        RenderOutcome::Rendered(html)
    }

    /// Render immediately, bypassing the debounce and the cache.
    pub fn render_now(&self, content: &str) -> String {
        self.do_render(content)
    }

    /// The last rendered HTML, if any.
    pub async fn current_html(&self) -> String {
        self.inner.state.lock().await.html.clone()
    }

    /// Parse on the blocking pool, reusing the shared parser. For
    /// documents large enough that parsing would stall the reactor.
    pub async fn parse_offloaded(&self, content: String) -> String {
        let inner = self.inner.clone();
        let handle = tokio::task::spawn_blocking(move || inner.parser.parse(&content));
        match handle.await {
            Ok(html) => html,
            Err(err) => {
                warn!(%err, "offloaded parse task failed");
                String::new()
            }
        }
    }

    fn do_render(&self, content: &str) -> String {
        let mut html = self.inner.parser.parse(content);
        for processor in &self.inner.processors {
            processor.process(&mut html);
            debug!(processor = processor.name(), "post-processor applied");
        }
        html
    }
}
