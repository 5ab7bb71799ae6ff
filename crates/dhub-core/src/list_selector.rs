// ── Resource list selection ──
//
// Two scopes of selection: `in_list` holds what is selected among the rows
// currently visible, `total` what the user selected across every page seen
// so far. Rows selected on a page that scrolled away stay in `total` and
// come back selected when they reappear.
//
// Membership is always decided by key, never by instance.

use std::hash::Hash;

use crate::list_getter::DeviceListing;
use crate::model::{Resource, ResourceKey};

/// Anything a selector can hold.
pub trait Identified {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;
}

impl Identified for Resource {
    type Key = ResourceKey;

    fn key(&self) -> ResourceKey {
        Resource::key(self)
    }
}

impl Identified for DeviceListing {
    type Key = Option<String>;

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(ToString::to_string)
    }
}

type SelectionCallback<T> = Box<dyn Fn(&[T], &[T], &[T]) + Send + Sync>;

/// Selection tracker over a list view.
///
/// Invariant: every key in `in_list` is also in `total`.
pub struct ResourceListSelector<T: Identified> {
    visible: Vec<T>,
    in_list: Vec<T>,
    total: Vec<T>,
    callbacks: Vec<SelectionCallback<T>>,
}

impl<T: Identified> Default for ResourceListSelector<T> {
    fn default() -> Self {
        Self {
            visible: Vec::new(),
            in_list: Vec::new(),
            total: Vec::new(),
            callbacks: Vec::new(),
        }
    }
}

impl<T: Identified + Clone> ResourceListSelector<T> {
    pub fn new(visible: Vec<T>) -> Self {
        Self {
            visible,
            ..Self::default()
        }
    }

    /// Replace the rows the user currently sees. Selection is not touched;
    /// call [`Self::re_add_to_actual_list`] to rebuild `in_list`.
    pub fn set_visible(&mut self, visible: Vec<T>) {
        self.visible = visible;
    }

    /// Register a callback run after every mutation with
    /// `(total, in_list, visible)`.
    pub fn callback_on_selection<F>(&mut self, callback: F)
    where
        F: Fn(&[T], &[T], &[T]) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Select `resource` if it is not in the visible selection, deselect
    /// it otherwise.
    pub fn toggle(&mut self, resource: &T) {
        if self.is_in_list(resource) {
            self.remove(resource);
        } else {
            self.add(resource.clone(), false);
        }
    }

    /// Select every visible row, or clear both scopes.
    pub fn toggle_select_all(&mut self, select_all: bool) {
        if select_all {
            let visible = self.visible.clone();
            for resource in visible {
                self.add(resource, false);
            }
        } else {
            self.deselect_all();
        }
    }

    pub fn deselect_all(&mut self) {
        self.in_list.clear();
        self.total.clear();
        self.control();
    }

    /// Rebuild `in_list` from `resources` (a freshly fetched page), keeping
    /// only those already in `total`. `total` entries are refreshed with
    /// the newer instances but never grow.
    pub fn re_add_to_actual_list(&mut self, resources: &[T]) {
        self.in_list.clear();
        self.control();
        for resource in resources {
            let key = resource.key();
            if self.total.iter().any(|t| t.key() == key) {
                self.add(resource.clone(), true);
            }
        }
    }

    pub fn is_in_list(&self, resource: &T) -> bool {
        let key = resource.key();
        self.in_list.iter().any(|r| r.key() == key)
    }

    /// Add to `in_list` and, unless `in_list_only`, to `total`. Returns
    /// `false` without notifying when the resource was already in
    /// `in_list`.
    ///
    /// With `in_list_only`, a `total` entry with the same key is replaced
    /// by `resource`. A key `total` does not know yet is still added to it.
    pub fn add(&mut self, resource: T, in_list_only: bool) -> bool {
        if self.is_in_list(&resource) {
            return false;
        }
        let key = resource.key();
        match self.total.iter_mut().find(|t| t.key() == key) {
            Some(existing) if in_list_only => *existing = resource.clone(),
            Some(_) => {}
            None => self.total.push(resource.clone()),
        }
        self.in_list.push(resource);
        self.control();
        true
    }

    /// Remove from both scopes by key.
    pub fn remove(&mut self, resource: &T) {
        let key = resource.key();
        self.in_list.retain(|r| r.key() != key);
        self.total.retain(|r| r.key() != key);
        self.control();
    }

    pub fn in_list(&self) -> &[T] {
        &self.in_list
    }

    pub fn total(&self) -> &[T] {
        &self.total
    }

    pub fn visible(&self) -> &[T] {
        &self.visible
    }

    fn control(&self) {
        for callback in &self.callbacks {
            callback(&self.total, &self.in_list, &self.visible);
        }
    }
}
