//! Request integration: getter wiring, the per-request value bag, and the
//! memoized validator registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::chain::Validator;
use crate::error::ValidationError;
use crate::value::{Map, Value, ValueBag};

#[derive(Debug, Clone, Copy)]
enum Source {
    Param,
    Query,
    Body,
}

/// Hooks a request type offers the default getters.
///
/// Every method defaults to `None`, which the binding treats as an empty
/// mapping, so a request type only implements what it actually carries.
pub trait Request {
    /// Route parameters extracted by the router.
    fn route_params(&self) -> Option<Map> {
        None
    }

    /// Parsed query-string pairs.
    fn query(&self) -> Option<Map> {
        None
    }

    /// Parsed request body fields.
    fn body(&self) -> Option<Map> {
        None
    }
}

type Getter<C> = Rc<dyn Fn(&C) -> Option<Map>>;

/// The configured-once layer: holds the three extraction functions and
/// binds them to each incoming request.
///
/// Getters default to the [Request](Request) accessors and can be replaced
/// one at a time, for frameworks that keep params, query or body somewhere
/// unusual.
pub struct Middleware<C> {
    params: Getter<C>,
    query: Getter<C>,
    body: Getter<C>,
}

impl<C: Request> Middleware<C> {
    pub fn new() -> Self {
        Middleware {
            params: Rc::new(|ctx: &C| ctx.route_params()),
            query: Rc::new(|ctx: &C| ctx.query()),
            body: Rc::new(|ctx: &C| ctx.body()),
        }
    }
}

impl<C: Request> Default for Middleware<C> {
    fn default() -> Self {
        Middleware::new()
    }
}

impl<C> Middleware<C> {
    /// Replace the route-params getter.
    pub fn params_getter(mut self, f: impl Fn(&C) -> Option<Map> + 'static) -> Self {
        self.params = Rc::new(f);
        self
    }

    /// Replace the query getter.
    pub fn query_getter(mut self, f: impl Fn(&C) -> Option<Map> + 'static) -> Self {
        self.query = Rc::new(f);
        self
    }

    /// Replace the body getter.
    pub fn body_getter(mut self, f: impl Fn(&C) -> Option<Map> + 'static) -> Self {
        self.body = Rc::new(f);
        self
    }

    /// Initialize validation state for one request: an empty bag and an
    /// empty validator registry, both scoped to the returned binding.
    pub fn bind(&self, ctx: Rc<C>) -> Binding<C> {
        debug!("initializing request validation state");
        Binding {
            ctx,
            vals: Rc::new(RefCell::new(ValueBag::new())),
            validators: RefCell::new(HashMap::new()),
            params: self.params.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
        }
    }
}

/// Per-request validation state: the shared bag plus the memoized
/// key → validator registry.
///
/// Dropping the binding at the end of the request tears everything down;
/// there is no explicit cleanup.
pub struct Binding<C> {
    ctx: Rc<C>,
    vals: Rc<RefCell<ValueBag>>,
    validators: RefCell<HashMap<String, Rc<Validator<C>>>>,
    params: Getter<C>,
    query: Getter<C>,
    body: Getter<C>,
}

impl<C> Binding<C> {
    /// Chain for a route parameter.
    pub fn validate_param(&self, key: &str) -> Rc<Validator<C>> {
        self.validator_for(key, Source::Param)
    }

    /// Chain for a query-string value.
    pub fn validate_query(&self, key: &str) -> Rc<Validator<C>> {
        self.validator_for(key, Source::Query)
    }

    /// Chain for a body field.
    pub fn validate_body(&self, key: &str) -> Rc<Validator<C>> {
        self.validator_for(key, Source::Body)
    }

    // Repeated lookups for a key return the registered instance, so a chain
    // keeps its optional state no matter how it is reached. A fresh chain is
    // seeded from the bag when an earlier step already defined the value,
    // and from the extraction function otherwise.
    fn validator_for(&self, key: &str, source: Source) -> Rc<Validator<C>> {
        if let Some(existing) = self.validators.borrow().get(key) {
            return existing.clone();
        }

        let seeded = self
            .vals
            .borrow()
            .get(key)
            .filter(|value| !value.is_undefined())
            .cloned();
        let initial = match seeded {
            Some(value) => value,
            None => {
                let getter: &dyn Fn(&C) -> Option<Map> = match source {
                    Source::Param => self.params.as_ref(),
                    Source::Query => self.query.as_ref(),
                    Source::Body => self.body.as_ref(),
                };
                getter(&self.ctx)
                    .and_then(|mapping| mapping.get(key).cloned())
                    .unwrap_or(Value::Undefined)
            }
        };

        let validator = Rc::new(Validator::new(
            Rc::downgrade(&self.ctx),
            key,
            initial,
            self.vals.clone(),
        ));
        self.validators
            .borrow_mut()
            .insert(key.to_string(), validator.clone());
        validator
    }

    /// Request-level assertion not tied to any key; the raised error has no
    /// key.
    pub fn check(&self, result: bool, tip: impl Into<String>) -> Result<(), ValidationError> {
        if result {
            Ok(())
        } else {
            Err(ValidationError::keyless(tip))
        }
    }

    /// Inverse of [check](Self::check).
    pub fn check_not(&self, result: bool, tip: impl Into<String>) -> Result<(), ValidationError> {
        if result {
            Err(ValidationError::keyless(tip))
        } else {
            Ok(())
        }
    }

    /// The request's shared value bag: the record of validated and coerced
    /// values so far.
    pub fn vals(&self) -> Rc<RefCell<ValueBag>> {
        self.vals.clone()
    }

    /// The bound request context.
    pub fn context(&self) -> &Rc<C> {
        &self.ctx
    }
}
