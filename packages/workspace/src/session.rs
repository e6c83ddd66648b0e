//! # Edit Session
//!
//! One open clone: the rendering surface, its selection controller, the
//! script manager drafts and the save path.
//!
//! ```text
//! open(html) → select / apply / link / remove … → render() → save(api)
//!                                                   │
//!                      scripts reinserted into a copy, then snapshotted
//! ```
//!
//! Saving never mutates the live document until the hosting API has
//! accepted the new HTML, so a failed save can simply be retried.

use crate::edit_script::ElementTarget;
use crate::hosting::{HostingApi, SaveRequest, SaveResponse};
use crate::WorkspaceError;
use clonup_editor::{
    EditCommand, EditableDocument, ElementAddress, ElementAddresser, RenderingSurface,
    SelectionController, SelectionState, SurfaceHandle,
};
use clonup_scripts::{extract, reinsert, ScriptLocation};
use clonup_snapshot::{ManagedDomainSet, Snapshot, SnapshotPipeline};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

pub struct EditSession {
    subdomain: String,
    surface: SurfaceHandle,
    controller: SelectionController,
    pipeline: SnapshotPipeline,
    script_drafts: RefCell<BTreeMap<ScriptLocation, String>>,
    saving: Cell<bool>,
    saved_version: Cell<u64>,
}

impl EditSession {
    /// Parse and instrument a clone for editing
    pub fn open(
        html: &str,
        subdomain: &str,
        domains: ManagedDomainSet,
    ) -> Result<Self, WorkspaceError> {
        let document = EditableDocument::open(html, subdomain)?;
        let (mut surface, events) =
            RenderingSurface::new(document, ElementAddresser::new(subdomain));
        surface.initialize();

        let surface = SurfaceHandle::new(surface);
        let controller = SelectionController::new(surface.clone(), events);

        info!(subdomain, bytes = html.len(), "Opened clone");
        Ok(Self {
            subdomain: subdomain.to_string(),
            surface,
            controller,
            pipeline: SnapshotPipeline::new(domains),
            script_drafts: RefCell::new(BTreeMap::new()),
            saving: Cell::new(false),
            saved_version: Cell::new(0),
        })
    }

    /// Fetch the clone's current HTML and open it
    pub async fn fetch<A: HostingApi>(
        api: &A,
        subdomain: &str,
        domains: ManagedDomainSet,
    ) -> Result<Self, WorkspaceError> {
        let html = api.fetch_clone(subdomain).await?;
        Self::open(&html, subdomain, domains)
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    pub fn selection(&self) -> &SelectionState {
        self.controller.state()
    }

    /// Document version; bumped by every applied edit
    pub fn version(&self) -> u64 {
        self.surface.borrow().document().version
    }

    /// Unsaved edits or script drafts exist
    pub fn is_dirty(&self) -> bool {
        self.version() != self.saved_version.get() || !self.script_drafts.borrow().is_empty()
    }

    /// Select the element `target` names, as a click on it would
    pub fn select(&mut self, target: &ElementTarget) -> Result<ElementAddress, WorkspaceError> {
        let node = {
            let surface = self.surface.borrow();
            target.resolve(surface.tree())
        }
        .ok_or_else(|| WorkspaceError::TargetNotFound(target.to_string()))?;

        let id = self
            .surface
            .borrow_mut()
            .click(node)
            .ok_or_else(|| WorkspaceError::TargetNotFound(target.to_string()))?;
        self.controller.handle_events();
        Ok(id)
    }

    pub fn clear_selection(&mut self) {
        self.surface.borrow_mut().clear_selection();
        self.controller.handle_events();
    }

    pub fn apply(&mut self, command: EditCommand) -> Result<(), WorkspaceError> {
        self.controller.apply(command)?;
        Ok(())
    }

    pub fn wrap_link(&mut self, href: &str) -> Result<(), WorkspaceError> {
        self.controller.wrap_link(href)?;
        Ok(())
    }

    pub fn remove_selected(&mut self) -> Result<(), WorkspaceError> {
        self.controller.remove_selected()?;
        Ok(())
    }

    /// Insert markup under `parent` (palette drop)
    pub fn insert_html(
        &mut self,
        parent: &ElementTarget,
        index: usize,
        html: &str,
    ) -> Result<Vec<ElementAddress>, WorkspaceError> {
        let parent = {
            let surface = self.surface.borrow();
            parent.resolve(surface.tree())
        }
        .ok_or_else(|| WorkspaceError::TargetNotFound(parent.to_string()))?;
        let ids = self.surface.borrow_mut().insert_html(parent, index, html)?;
        self.controller.handle_events();
        Ok(ids)
    }

    /// Move `target` under `parent` at `index` (section drag)
    pub fn move_element(
        &mut self,
        target: &ElementTarget,
        parent: &ElementTarget,
        index: usize,
    ) -> Result<(), WorkspaceError> {
        let (node, new_parent) = {
            let surface = self.surface.borrow();
            (target.resolve(surface.tree()), parent.resolve(surface.tree()))
        };
        let node = node.ok_or_else(|| WorkspaceError::TargetNotFound(target.to_string()))?;
        let new_parent =
            new_parent.ok_or_else(|| WorkspaceError::TargetNotFound(parent.to_string()))?;
        if self.surface.borrow_mut().drag(node, new_parent, index).is_none() {
            return Err(WorkspaceError::InvalidMove(target.to_string()));
        }
        self.controller.handle_events();
        Ok(())
    }

    /// Editable script text: the pending draft, or what the page holds now
    pub fn script_text(&self, location: ScriptLocation) -> String {
        if let Some(draft) = self.script_drafts.borrow().get(&location) {
            return draft.clone();
        }
        extract(self.surface.borrow().tree()).editable_text(location)
    }

    /// Stage edited script text; applied on the next save
    pub fn set_script_text(&mut self, location: ScriptLocation, text: impl Into<String>) {
        self.script_drafts
            .borrow_mut()
            .insert(location, text.into());
    }

    /// Persistable HTML for the current state, drafts included.
    ///
    /// Works on a copy; the live document is not touched.
    pub fn render(&self) -> Result<Snapshot, WorkspaceError> {
        let mut working = self.surface.borrow().document().clone();
        for (location, text) in self.script_drafts.borrow().iter() {
            reinsert(working.tree_mut(), *location, text)?;
        }
        Ok(self.pipeline.serialize_document(&working)?)
    }

    /// Render and persist. Only one save may be in flight.
    #[instrument(skip(self, api), fields(subdomain = %self.subdomain))]
    pub async fn save<A: HostingApi>(&self, api: &A) -> Result<SaveResponse, WorkspaceError> {
        if self.saving.replace(true) {
            return Err(WorkspaceError::SaveInProgress);
        }
        let _in_flight = InFlight(&self.saving);
        let result = self.save_inner(api).await;

        if let Err(err) = &result {
            warn!(error = %err, retryable = err.is_retryable(), "Save failed");
        }
        result
    }

    async fn save_inner<A: HostingApi>(&self, api: &A) -> Result<SaveResponse, WorkspaceError> {
        let version = self.version();
        let snapshot = self.render()?;
        let request = SaveRequest {
            subdomain: self.subdomain.clone(),
            html: snapshot.html,
        };
        let response = api.save(&request).await?;

        // accepted: bring the live document in line with what was saved
        let drafts = std::mem::take(&mut *self.script_drafts.borrow_mut());
        {
            let mut surface = self.surface.borrow_mut();
            for (location, text) in &drafts {
                reinsert(surface.tree_mut(), *location, text)?;
            }
        }
        self.saved_version.set(version);

        info!(
            version,
            bytes = request.html.len(),
            stripped = snapshot.stats.stripped,
            "Saved clone"
        );
        Ok(response)
    }
}

/// Clears the in-flight flag however the save ends, cancellation included
struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
