//! The middleware stack.
//!
//! A [`MiddlewareStack`] keeps named [`Middleware`] entries and composes them
//! around a terminal handler. Entries are ordered by [`Step`], then
//! [`Priority`], then insertion order; entries added with
//! [`MiddlewareStack::add_relative_to`] sit immediately before or after their
//! anchor instead.
//!
//! The first middleware in that order is the outermost one: it sees the
//! request first and the response last.
//!
//! # Example
//!
//! ```ignore
//! use strata::stack::{Middleware, MiddlewareStack, Step};
//! use tower::service_fn;
//!
//! let mut stack = MiddlewareStack::new();
//! stack.add(Middleware::new("auth", auth_layer).with_step(Step::FinalizeRequest))?;
//! stack.add(Middleware::new("logger", LoggingLayer::new()))?;
//!
//! let service = stack.resolve(service_fn(send))?;
//! ```

mod middleware;
mod plugin;

use tower::util::BoxCloneService;
use tower_service::Service;
use tracing::debug;

pub use middleware::{Middleware, Priority, Relation, Step};
pub use plugin::Plugin;

use crate::{Error, Request, Response, Result};

/// Type-erased service for middleware composition.
///
/// Every middleware wraps one of these and is itself boxed into one, so
/// stacks of arbitrary length keep a single concrete type.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// Ordered, named collection of middleware.
///
/// The stack is a plain value: [`MiddlewareStack::resolve`] borrows it and
/// returns an independent service, so editing the stack afterwards never
/// affects chains already resolved. Cloning is cheap since the layers are
/// shared.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareStack {
    entries: Vec<Middleware>,
}

impl MiddlewareStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No middleware is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A middleware with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name() == name)
    }

    /// Adds a middleware ordered by its step and priority.
    ///
    /// If a middleware with the same name exists and `middleware` was built
    /// with [`Middleware::with_override`], the existing entry is replaced and
    /// the replacement keeps its insertion slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateMiddleware`] on a name collision without
    /// override. The stack is left unchanged.
    pub fn add(&mut self, mut middleware: Middleware) -> Result<()> {
        middleware.relation = None;
        self.insert(middleware)
    }

    /// Adds a middleware placed immediately before or after another one.
    ///
    /// The anchor does not need to exist yet; it must exist when the stack is
    /// resolved. Several middleware anchored on the same entry keep their
    /// insertion order. A relative middleware can itself be an anchor.
    ///
    /// # Errors
    ///
    /// Same as [`MiddlewareStack::add`].
    pub fn add_relative_to(&mut self, mut middleware: Middleware, relation: Relation) -> Result<()> {
        middleware.relation = Some(relation);
        self.insert(middleware)
    }

    fn insert(&mut self, middleware: Middleware) -> Result<()> {
        match self.position(middleware.name()) {
            Some(index) if middleware.is_override() => {
                debug!(name = middleware.name(), "overriding middleware");
                if let Some(slot) = self.entries.get_mut(index) {
                    *slot = middleware;
                }
                Ok(())
            }
            Some(_) => Err(Error::duplicate_middleware(middleware.name())),
            None => {
                self.entries.push(middleware);
                Ok(())
            }
        }
    }

    /// Removes a middleware by name.
    ///
    /// Removing a name that is not registered is a no-op and returns `false`.
    /// Middleware anchored on the removed entry stay registered and make
    /// [`MiddlewareStack::resolve`] fail until their anchor comes back.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.name() != name);
        before != self.entries.len()
    }

    /// Removes every middleware carrying `tag`, returning whether any was removed.
    pub fn remove_by_tag(&mut self, tag: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.has_tag(tag));
        before != self.entries.len()
    }

    /// Applies a plugin.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the plugin.
    pub fn use_plugin(&mut self, plugin: &(impl Plugin + ?Sized)) -> Result<()> {
        plugin.apply_to_stack(self)
    }

    /// Returns a new stack holding this stack's middleware followed by `other`'s.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateMiddleware`] when both stacks share a name
    /// and the entry from `other` is not an override.
    pub fn concat(&self, other: &Self) -> Result<Self> {
        let mut stack = self.clone();
        for entry in &other.entries {
            stack.insert(entry.clone())?;
        }
        Ok(stack)
    }

    /// Middleware in execution order, outermost first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MiddlewareNotFound`] when a relative middleware's
    /// anchor is not reachable from the ordered entries.
    pub fn ordered(&self) -> Result<Vec<&Middleware>> {
        let mut roots: Vec<&Middleware> = self
            .entries
            .iter()
            .filter(|entry| entry.relation().is_none())
            .collect();
        // stable: equal step and priority keep insertion order
        roots.sort_by_key(|entry| (entry.step(), entry.priority()));

        let mut ordered = Vec::with_capacity(self.entries.len());
        for root in roots {
            self.expand(root, &mut ordered);
        }

        if let Some(orphan) = self
            .entries
            .iter()
            .find(|entry| !ordered.iter().any(|seen| seen.name() == entry.name()))
        {
            // only relative entries can be left out: their anchor is missing
            // or itself unreachable
            let anchor = orphan.relation().map_or(orphan.name(), Relation::anchor);
            return Err(Error::middleware_not_found(anchor));
        }

        Ok(ordered)
    }

    fn expand<'a>(&'a self, anchor: &'a Middleware, ordered: &mut Vec<&'a Middleware>) {
        for entry in self.anchored_on(anchor.name(), true) {
            self.expand(entry, ordered);
        }
        ordered.push(anchor);
        for entry in self.anchored_on(anchor.name(), false) {
            self.expand(entry, ordered);
        }
    }

    fn anchored_on<'a>(
        &'a self,
        anchor: &'a str,
        before: bool,
    ) -> impl Iterator<Item = &'a Middleware> + 'a {
        self.entries
            .iter()
            .filter(move |entry| match entry.relation() {
                Some(Relation::Before(name)) => before && name == anchor,
                Some(Relation::After(name)) => !before && name == anchor,
                None => false,
            })
    }

    /// Describes the resolved order, one `"<name> - <placement>"` line per
    /// middleware where placement is the step or the relation.
    ///
    /// # Errors
    ///
    /// Same as [`MiddlewareStack::ordered`].
    pub fn identify(&self) -> Result<Vec<String>> {
        Ok(self
            .ordered()?
            .into_iter()
            .map(|entry| match entry.relation() {
                Some(relation) => format!("{} - {relation}", entry.name()),
                None => format!("{} - {}", entry.name(), entry.step()),
            })
            .collect())
    }

    /// Composes the stack around a terminal handler.
    ///
    /// The terminal handler performs the actual I/O. The returned service runs
    /// the middleware in [`MiddlewareStack::ordered`] order on the way in and
    /// in reverse order on the way out.
    ///
    /// # Errors
    ///
    /// Same as [`MiddlewareStack::ordered`].
    pub fn resolve<S>(&self, terminal: S) -> Result<BoxedService>
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        let ordered = self.ordered()?;
        debug!(
            middleware = ?ordered.iter().map(|entry| entry.name()).collect::<Vec<_>>(),
            "resolved middleware stack"
        );

        let mut service = BoxCloneService::new(terminal);
        for entry in ordered.into_iter().rev() {
            service = entry.wrap(service);
        }
        Ok(service)
    }
}
