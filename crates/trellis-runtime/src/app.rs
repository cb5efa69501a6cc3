#![forbid(unsafe_code)]

//! The mount loop: a render function executed under an eager watcher.
//!
//! [`App`] owns the pieces one mounted instance needs: a tracking context, a
//! shared document, reactive state, computed properties, the render
//! function, and the previous vnode tree. Mounting creates the render
//! watcher; its first evaluation renders and patches against the mount
//! point, and every dependency notification re-renders and patches the old
//! tree against the new one — synchronously, on the mutating call stack.
//! There is no batching: two mutations in a row mean two patches.
//!
//! # Failure modes
//!
//! The initial mount surfaces patch errors as `Result`. A patch error during
//! a reactive re-render is a programming error in the render function
//! (e.g. duplicate sibling keys) and panics on the triggering caller's
//! stack.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::debug;
use trellis_reactive::{ReactiveMap, TrackCx, Watcher};
use trellis_vdom::{Document, NodeId, PatchError, Previous, VNode, patch};

use crate::computed::ComputedRegistry;

/// Everything a render function may read.
pub struct RenderScope<'a> {
    pub cx: &'a TrackCx,
    pub state: &'a ReactiveMap,
    pub computed: &'a ComputedRegistry,
}

type RenderFn = Rc<dyn Fn(&RenderScope<'_>) -> VNode>;

struct AppInner {
    cx: TrackCx,
    doc: Document,
    state: ReactiveMap,
    computed: ComputedRegistry,
    render: RenderFn,
    /// Previous render's tree; `None` before the first render.
    tree: RefCell<Option<VNode>>,
    root_el: Cell<Option<NodeId>>,
    mount_point: Cell<Option<NodeId>>,
    mounted: Cell<bool>,
    last_error: RefCell<Option<PatchError>>,
    /// Keeps the render watcher alive; deps hold it weakly.
    watcher: RefCell<Option<Watcher<()>>>,
}

/// One mounted (or mountable) instance.
///
/// Cloning shares the same instance.
#[derive(Clone)]
pub struct App {
    inner: Rc<AppInner>,
}

impl App {
    pub fn new(
        doc: &Document,
        state: ReactiveMap,
        render: impl Fn(&RenderScope<'_>) -> VNode + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(AppInner {
                cx: TrackCx::new(),
                doc: doc.clone(),
                state,
                computed: ComputedRegistry::new(),
                render: Rc::new(render),
                tree: RefCell::new(None),
                root_el: Cell::new(None),
                mount_point: Cell::new(None),
                mounted: Cell::new(false),
                last_error: RefCell::new(None),
                watcher: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> &ReactiveMap {
        &self.inner.state
    }

    #[must_use]
    pub fn cx(&self) -> &TrackCx {
        &self.inner.cx
    }

    #[must_use]
    pub fn doc(&self) -> &Document {
        &self.inner.doc
    }

    /// Install a named computed property over this app's state.
    pub fn define_computed(
        &self,
        name: impl Into<String>,
        compute: impl Fn(&TrackCx, &ReactiveMap) -> trellis_reactive::Scalar + 'static,
    ) {
        let state = self.inner.state.clone();
        self.inner
            .computed
            .define(&self.inner.cx, name, move |cx| compute(cx, &state));
    }

    /// Real root of the last render, once mounted.
    #[must_use]
    pub fn root_el(&self) -> Option<NodeId> {
        self.inner.root_el.get()
    }

    /// Mount over an existing document node. The first render's tree is
    /// inserted next to `mount_point`, which is then removed.
    pub fn mount(&self, mount_point: NodeId) -> Result<NodeId, PatchError> {
        if self.inner.mounted.get() {
            return Ok(self
                .inner
                .root_el
                .get()
                .expect("mounted app has a root"));
        }
        self.inner.mount_point.set(Some(mount_point));
        self.start()
    }

    /// Mount without a mount point: build the first render's tree and return
    /// its root, leaving insertion to the caller. This is the construction
    /// path component hooks use.
    pub fn mount_detached(&self) -> Result<NodeId, PatchError> {
        if self.inner.mounted.get() {
            return Ok(self
                .inner
                .root_el
                .get()
                .expect("mounted app has a root"));
        }
        self.start()
    }

    fn start(&self) -> Result<NodeId, PatchError> {
        let weak = Rc::downgrade(&self.inner);
        let watcher = Watcher::eager(&self.inner.cx, move |cx| {
            render_and_patch(&weak, cx);
        });
        if let Some(err) = self.inner.last_error.borrow_mut().take() {
            return Err(err);
        }
        *self.inner.watcher.borrow_mut() = Some(watcher);
        self.inner.mounted.set(true);
        Ok(self
            .inner
            .root_el
            .get()
            .expect("first render bound a root"))
    }
}

/// One render pass: evaluate the render function under the watcher, then
/// patch the previous tree (or the mount point) against the new tree.
fn render_and_patch(app: &Weak<AppInner>, cx: &TrackCx) {
    let Some(app) = app.upgrade() else {
        return;
    };
    let scope = RenderScope {
        cx,
        state: &app.state,
        computed: &app.computed,
    };
    let next = (app.render)(&scope);

    let prev = app.tree.borrow().clone();
    let result = match (&prev, app.mount_point.take()) {
        (Some(old), _) => patch(&app.doc, Previous::Node(old), &next),
        (None, Some(mount_point)) => patch(&app.doc, Previous::Mount(mount_point), &next),
        (None, None) => patch(&app.doc, Previous::None, &next),
    };
    match result {
        Ok(el) => {
            debug!(?el, rerender = app.mounted.get(), "patched");
            app.root_el.set(Some(el));
            *app.tree.borrow_mut() = Some(next);
        }
        Err(err) if app.mounted.get() => panic!("reactive re-render failed: {err}"),
        Err(err) => {
            app.last_error.borrow_mut().replace(err);
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("mounted", &self.inner.mounted.get())
            .field("root_el", &self.inner.root_el.get())
            .finish()
    }
}
