//! The render cycle.
//!
//! Single-threaded and event-driven: `apply` a [`GraphChange`], run a
//! [`LayoutAlgorithm`] on the returned pass, `commit` the pass. The two
//! suspension points (the layout future, the deferred-data fetch) are local
//! futures driven on the caller's thread. Cancellation is by generation:
//! every `apply` advances the counter and `commit` drops any pass carrying
//! an older one, so the last mutation always wins. A layout or data future
//! that never resolves stalls its own generation forever; nothing detects
//! that.

use physalia_anim::{DiagramState, OverviewSnapshot, Timeline, capture, diff};
use physalia_graph::geom::Rect;
use physalia_graph::{DirtySet, GraphStore, resolve};
use physalia_layout::{
    BoxMeasurer, CommitStats, LayoutAlgorithm, LayoutContext, LayoutOffsets, Measurer,
    apply_results, ensure_measured,
};
use tracing::{debug, warn};

use crate::Result;
use crate::change::{self, GraphChange};
use crate::provider::{DataProvider, FetchPayload, FetchRequest};
use crate::viewport::{PersistedState, Viewport};

/// Monotonic counter identifying one mutation's render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RenderGeneration(pub u64);

/// Where the engine currently is in its render cycle.
///
/// `Capturing`, `Computing` and `Diffing` are passed through inside `apply`
/// and `commit`; between the two the engine reports `Computing` (the caller
/// is driving the layout future), and after a moving commit it stays
/// `Animating` until [`Diagram::animation_settled`] or the next mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPhase {
    #[default]
    Idle,
    Capturing,
    Computing,
    Diffing,
    Animating,
}

/// One in-flight render pass: the pre-mutation snapshot, the layout context
/// for the algorithm to fill in, and the generation that guards the commit.
pub struct UpdatePass {
    pub context: LayoutContext,
    snapshot: DiagramState,
    generation: RenderGeneration,
}

impl UpdatePass {
    pub fn generation(&self) -> RenderGeneration {
        self.generation
    }
}

/// Outcome of committing a pass.
#[derive(Debug)]
pub enum RenderUpdate {
    /// The pass was outdated by a newer mutation and was dropped.
    Stale,
    /// The layout failed; the previous rendering is retained.
    Retained,
    /// The pass was committed.
    Committed {
        /// The new rendered state, overview included.
        state: DiagramState,
        /// Animation program from the pre-mutation state to `state`.
        timeline: Timeline,
        stats: CommitStats,
        /// An in-flight animation was fast-forwarded to make room for this
        /// cycle.
        interrupted: bool,
    },
}

/// The facade: a graph store, a viewport and the render cycle around them.
pub struct Diagram {
    store: GraphStore,
    measurer: Box<dyn Measurer>,
    provider: Option<Box<dyn DataProvider>>,
    viewport: Viewport,
    offsets: LayoutOffsets,
    dirty: DirtySet,
    generation: RenderGeneration,
    phase: RenderPhase,
    /// Pre-mutation snapshot, held while its animation plays.
    retained: Option<DiagramState>,
    interrupted: bool,
}

impl Default for Diagram {
    fn default() -> Self {
        Self {
            store: GraphStore::new(),
            measurer: Box::new(BoxMeasurer::default()),
            provider: None,
            viewport: Viewport::default(),
            offsets: LayoutOffsets::default(),
            dirty: DirtySet::new(),
            generation: RenderGeneration::default(),
            phase: RenderPhase::Idle,
            retained: None,
            interrupted: false,
        }
    }
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the leaf-size measurer (the only read-back from the shape
    /// layer).
    pub fn with_measurer(mut self, measurer: Box<dyn Measurer>) -> Self {
        self.measurer = measurer;
        self
    }

    /// Installs the source for deferred children.
    pub fn with_provider(mut self, provider: Box<dyn DataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn generation(&self) -> RenderGeneration {
        self.generation
    }

    /// Union of the root nodes' decorated bounds, in global coordinates.
    pub fn content_bounds(&self) -> Rect {
        let mut acc: Option<Rect> = None;
        for id in self.store.root_ids() {
            if let Some(bounds) = self.store.decorated_bounds(id) {
                acc = Some(match acc {
                    Some(a) => a.union(&bounds),
                    None => bounds,
                });
            }
        }
        acc.unwrap_or_else(Rect::zero)
    }

    /// Snapshot for the external minimap.
    pub fn overview(&self) -> OverviewSnapshot {
        OverviewSnapshot {
            content_bounds: self.content_bounds(),
            view_rect: self.viewport.view_rect(),
        }
    }

    /// Applies a mutation and opens a render pass for it.
    ///
    /// Captures the current rendered state first, fast-forwarding any
    /// animation still playing, then mutates the store and builds the
    /// layout context. Deferred containers disclosed by `change` are *not*
    /// fetched here; use [`Diagram::update`] for provider-driven expansion.
    pub fn apply(&mut self, change: GraphChange) -> Result<UpdatePass> {
        let (snapshot, _fetches) = self.begin(change)?;
        Ok(self.build_pass(snapshot))
    }

    /// Commits a finished pass, writing the layout results back and diffing
    /// the rendered state against the pass's pre-mutation snapshot.
    ///
    /// A pass from an older generation is dropped ([`RenderUpdate::Stale`]);
    /// the store is untouched in that case.
    pub fn commit(&mut self, pass: UpdatePass) -> Result<RenderUpdate> {
        if pass.generation != self.generation {
            debug!(
                pass = pass.generation.0,
                current = self.generation.0,
                "dropping stale render pass"
            );
            return Ok(RenderUpdate::Stale);
        }
        let UpdatePass {
            mut context,
            snapshot,
            ..
        } = pass;
        let stats = apply_results(
            &mut self.store,
            &mut context,
            &mut self.offsets,
            self.measurer.as_ref(),
        )?;
        self.dirty.clear();

        self.phase = RenderPhase::Diffing;
        let state = self.capture_current();
        let timeline = diff(&snapshot, &state);
        let interrupted = std::mem::take(&mut self.interrupted);
        if timeline.is_still() {
            self.phase = RenderPhase::Idle;
            self.retained = None;
        } else {
            self.phase = RenderPhase::Animating;
            self.retained = Some(snapshot);
        }
        debug!(
            generation = self.generation.0,
            nodes = stats.nodes_committed,
            links = stats.links_committed,
            still = matches!(self.phase, RenderPhase::Idle),
            "committed render pass"
        );
        Ok(RenderUpdate::Committed {
            state,
            timeline,
            stats,
            interrupted,
        })
    }

    /// Runs one full cycle: apply, fetch deferred children, lay out, commit.
    ///
    /// A failing layout future is recovered locally: the pass is discarded,
    /// the previous rendering stays ([`RenderUpdate::Retained`]) and the
    /// generation keeps any stale completion from landing later.
    pub async fn update(
        &mut self,
        change: GraphChange,
        algo: &dyn LayoutAlgorithm,
    ) -> Result<RenderUpdate> {
        let (snapshot, fetches) = self.begin(change)?;
        for container in &fetches {
            self.fetch_deferred(container).await;
        }
        let mut pass = self.build_pass(snapshot);
        match algo.run(&mut pass.context).await {
            Ok(()) => self.commit(pass),
            Err(err) => {
                warn!(error = %err, "layout failed; retaining previous rendering");
                self.phase = RenderPhase::Idle;
                Ok(RenderUpdate::Retained)
            }
        }
    }

    /// Opens a pass that re-layouts everything from scratch, discarding the
    /// cached per-scope offsets. The graph itself is not changed.
    pub fn relayout(&mut self) -> UpdatePass {
        if self.phase == RenderPhase::Animating {
            self.fast_forward();
            self.interrupted = true;
        }
        self.phase = RenderPhase::Capturing;
        let snapshot = self.capture_current();
        self.generation.0 += 1;
        self.offsets.clear();
        self.dirty.clear();
        self.build_pass(snapshot)
    }

    /// Host signal that the animation for the last committed pass finished
    /// playing.
    pub fn animation_settled(&mut self) {
        if self.phase == RenderPhase::Animating {
            self.retained = None;
            self.phase = RenderPhase::Idle;
        }
    }

    /// The persisted slice of the interactive state: viewport plus the
    /// expanded-container set.
    pub fn persisted_state(&self) -> PersistedState {
        let expanded = self
            .store
            .nodes()
            .filter(|n| {
                n.is_disclosed()
                    && (n.is_deferred() || !self.store.child_ids(n.id()).is_empty())
            })
            .map(|n| n.id().to_string())
            .collect();
        PersistedState {
            zoom: self.viewport.zoom,
            center_x: self.viewport.center.x,
            center_y: self.viewport.center.y,
            expanded,
        }
    }

    /// Restores a persisted state: viewport plus disclosure flips.
    ///
    /// Containers absent from `state.expanded` are collapsed. Deferred data
    /// is not fetched here; the next [`Diagram::update`] pass lays the
    /// restored diagram out.
    pub fn restore_state(&mut self, state: &PersistedState) {
        if self.phase == RenderPhase::Animating {
            self.fast_forward();
            self.interrupted = true;
        }
        self.viewport.zoom = state.zoom;
        self.viewport.center.x = state.center_x;
        self.viewport.center.y = state.center_y;

        let expanded: std::collections::BTreeSet<&str> =
            state.expanded.iter().map(String::as_str).collect();
        let containers: Vec<String> = self
            .store
            .nodes()
            .filter(|n| n.is_deferred() || !self.store.child_ids(n.id()).is_empty())
            .map(|n| n.id().to_string())
            .collect();
        let mut fetches = Vec::new();
        for id in containers {
            let disclosed = expanded.contains(id.as_str());
            let change = GraphChange::SetDisclosed { id, disclosed };
            // SetDisclosed cannot fail; the dirty set still gets populated.
            let _ = change::apply_change(&mut self.store, change, &mut self.dirty, &mut fetches);
        }
        self.offsets.clear();
        self.generation.0 += 1;
        self.phase = RenderPhase::Idle;
    }

    fn fast_forward(&mut self) {
        debug!(generation = self.generation.0, "fast-forwarding animation");
        self.retained = None;
        self.phase = RenderPhase::Idle;
    }

    fn capture_current(&self) -> DiagramState {
        let resolved = resolve(&self.store);
        let mut state = capture(&self.store, &resolved, self.viewport.transform());
        state.overview = Some(self.overview());
        state
    }

    /// Capture, mutate, advance the generation. Returns the pre-mutation
    /// snapshot and the deferred containers that now need a fetch.
    fn begin(&mut self, change: GraphChange) -> Result<(DiagramState, Vec<String>)> {
        if self.phase == RenderPhase::Animating {
            self.fast_forward();
            self.interrupted = true;
        }
        self.phase = RenderPhase::Capturing;
        let snapshot = self.capture_current();
        let mut fetches = Vec::new();
        let applied = change::apply_change(&mut self.store, change, &mut self.dirty, &mut fetches);
        // A mid-batch failure may have mutated the store already, so the
        // generation advances even on error.
        self.generation.0 += 1;
        match applied {
            Ok(()) => Ok((snapshot, fetches)),
            Err(err) => {
                self.phase = RenderPhase::Idle;
                Err(err)
            }
        }
    }

    /// Measures what the context will read, then builds it. The first pass
    /// after construction (or [`Diagram::relayout`]) is a full one; once
    /// offsets are cached, passes are incremental over the dirty set.
    fn build_pass(&mut self, snapshot: DiagramState) -> UpdatePass {
        let roots: Vec<String> = self
            .store
            .root_ids()
            .iter()
            .map(|s| s.to_string())
            .collect();
        for root in &roots {
            ensure_measured(&mut self.store, root, self.measurer.as_ref());
        }
        let resolved = resolve(&self.store);
        let dirty = (!self.offsets.is_empty()).then_some(&self.dirty);
        let context = LayoutContext::build(&self.store, &resolved, None, dirty);
        self.phase = RenderPhase::Computing;
        UpdatePass {
            context,
            snapshot,
            generation: self.generation,
        }
    }

    async fn fetch_deferred(&mut self, container: &str) {
        let result = match self.provider.as_deref() {
            Some(provider) => {
                let req = FetchRequest {
                    container,
                    known: self.store.child_ids(container),
                };
                provider.fetch(req).await
            }
            None => return,
        };
        match result {
            Ok(payload) => self.insert_fetched(container, payload),
            Err(err) => {
                debug!(container, error = %err, "provider failed; disclosing with known children");
            }
        }
    }

    /// Folds a fetch payload into the store. Specs colliding with existing
    /// ids are dropped; a provider that contradicts the store is treated
    /// like one that returned less data.
    fn insert_fetched(&mut self, container: &str, payload: FetchPayload) {
        let nodes: Vec<_> = payload
            .nodes
            .into_iter()
            .filter(|spec| !self.store.has_node(&spec.id))
            .collect();
        let links: Vec<_> = payload
            .links
            .into_iter()
            .filter(|spec| !self.store.has_link(&spec.id))
            .collect();
        debug!(
            container,
            nodes = nodes.len(),
            links = links.len(),
            "inserting fetched children"
        );
        if !nodes.is_empty() {
            match self.store.add_nodes(Some(container), nodes) {
                Ok(ids) => {
                    for id in &ids {
                        self.dirty.insert_node(id.as_str());
                    }
                }
                Err(err) => debug!(container, error = %err, "discarding fetched nodes"),
            }
        }
        for spec in links {
            let id = spec.id.clone();
            match self.store.add_link(spec) {
                Ok(id) => self.dirty.insert_link(id),
                Err(err) => debug!(link = id.as_str(), error = %err, "discarding fetched link"),
            }
        }
        self.store.mark_fetched(container);
        self.store.invalidate_bounds_upward(container);
    }
}
