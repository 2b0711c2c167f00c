//! Middleware descriptors.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use derive_more::Display;
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use super::BoxedService;
use crate::{Error, Request, Response};

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Coarse execution stage of a middleware.
///
/// Steps run in declaration order on the way in: everything registered for
/// [`Step::Initialize`] wraps everything registered for [`Step::Serialize`],
/// and so on down to the terminal handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Step {
    /// Sees the request as the caller built it.
    #[default]
    #[display("initialize")]
    Initialize,
    /// Turns the caller's input into a wire request.
    #[display("serialize")]
    Serialize,
    /// Adds stable headers and body metadata.
    #[display("build")]
    Build,
    /// Last mutations before sending (signing, retries).
    #[display("finalizeRequest")]
    FinalizeRequest,
    /// Closest to the transport, first to see the raw response.
    #[display("deserialize")]
    Deserialize,
}

/// Ordering hint among middleware of the same [`Step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Priority {
    /// Runs first within its step.
    #[display("high")]
    High,
    /// Default.
    #[default]
    #[display("normal")]
    Normal,
    /// Runs last within its step.
    #[display("low")]
    Low,
}

/// Placement of a middleware next to another named middleware.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Relation {
    /// Wraps just outside the named middleware.
    #[display("before {_0}")]
    Before(String),
    /// Runs just inside the named middleware.
    #[display("after {_0}")]
    After(String),
}

impl Relation {
    /// Name of the anchor middleware.
    #[must_use]
    pub fn anchor(&self) -> &str {
        match self {
            Self::Before(name) | Self::After(name) => name,
        }
    }
}

/// A named, ordered middleware entry.
///
/// The handler is a Tower [`Layer`]: given the next service in the chain it
/// returns a service that may inspect or rewrite the request, call the next
/// service (or not), and post-process the response.
///
/// # Example
///
/// ```ignore
/// use strata::stack::{Middleware, Priority, Step};
/// use strata::middleware::ContentLengthLayer;
///
/// let middleware = Middleware::new("contentLength", ContentLengthLayer::new())
///     .with_step(Step::Build)
///     .with_priority(Priority::High)
///     .with_tag("CONTENT_LENGTH");
/// ```
#[derive(Clone)]
pub struct Middleware {
    name: String,
    step: Step,
    priority: Priority,
    tags: BTreeSet<String>,
    override_existing: bool,
    pub(crate) relation: Option<Relation>,
    layer: LayerFn,
}

impl Middleware {
    /// Creates a middleware at [`Step::Initialize`] with [`Priority::Normal`].
    pub fn new<L>(name: impl Into<String>, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self {
            name: name.into(),
            step: Step::default(),
            priority: Priority::default(),
            tags: BTreeSet::new(),
            override_existing: false,
            relation: None,
            layer: Arc::new(move |service| BoxCloneService::new(layer.layer(service))),
        }
    }

    /// Sets the step.
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.step = step;
        self
    }

    /// Sets the priority within the step.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Replace an existing middleware with the same name instead of failing.
    #[must_use]
    pub fn with_override(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    /// Unique name within a stack.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution step.
    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    /// Priority within the step.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Tags attached to this middleware.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether adding this middleware replaces a same-name entry.
    #[must_use]
    pub const fn is_override(&self) -> bool {
        self.override_existing
    }

    /// Placement relative to another middleware, if any.
    #[must_use]
    pub const fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }

    pub(crate) fn wrap(&self, next: BoxedService) -> BoxedService {
        (self.layer)(next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("step", &self.step)
            .field("priority", &self.priority)
            .field("tags", &self.tags)
            .field("override_existing", &self.override_existing)
            .field("relation", &self.relation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;
    use tower::layer::util::Identity;

    use super::*;

    #[test]
    fn steps_are_ordered() {
        check!(Step::Initialize < Step::Serialize);
        check!(Step::Serialize < Step::Build);
        check!(Step::Build < Step::FinalizeRequest);
        check!(Step::FinalizeRequest < Step::Deserialize);
        check!(Step::FinalizeRequest.to_string() == "finalizeRequest");
    }

    #[test]
    fn high_priority_sorts_first() {
        let mut priorities = vec![Priority::Low, Priority::High, Priority::Normal];
        priorities.sort();
        check!(priorities == vec![Priority::High, Priority::Normal, Priority::Low]);
    }

    #[test]
    fn builder_defaults() {
        let middleware = Middleware::new("identity", Identity::new());

        check!(middleware.name() == "identity");
        check!(middleware.step() == Step::Initialize);
        check!(middleware.priority() == Priority::Normal);
        check!(middleware.tags().is_empty());
        check!(!middleware.is_override());
        check!(middleware.relation().is_none());
    }

    #[test]
    fn builder_settings() {
        let middleware = Middleware::new("identity", Identity::new())
            .with_step(Step::Build)
            .with_priority(Priority::Low)
            .with_tag("HOST")
            .with_tag("HOST")
            .with_override(true);

        check!(middleware.step() == Step::Build);
        check!(middleware.priority() == Priority::Low);
        check!(middleware.tags().len() == 1);
        check!(middleware.has_tag("HOST"));
        check!(middleware.is_override());
    }

    #[test]
    fn relation_display() {
        check!(Relation::After("hostHeader".into()).to_string() == "after hostHeader");
        check!(Relation::Before("logger".into()).anchor() == "logger");
    }
}
