/*!

# Overview

`vet` pulls named values out of an incoming HTTP request and runs each one
through a per-key validation chain. Every chain method either asserts
something about the current value or replaces it with a coerced form, and
the first failing assertion stops the chain with a
[ValidationError](ValidationError) for the surrounding framework to turn
into a 4xx response.

The pieces, leaf to root:

- [Value](Value): the dynamic shape a request value can take, and
  [ValueBag](ValueBag), the per-request mapping of validated values.
- [predicates](predicates): the pure checks and parsers the chain methods
  are built from.
- [Validator](Validator): the chain itself, a handle over one bag slot
  with an optional-state machine gating every method.
- [Middleware](Middleware) and [Binding](Binding): the integration layer
  that wires extraction functions to a request type and memoizes one chain
  per key per request.

# Basic Usage

Implement [Request](Request) for whatever your framework hands you, bind
it, and chain away:

```
use std::rc::Rc;
use vet::{Map, Middleware, Request, Value};

struct Incoming {
    query: Map,
}

impl Request for Incoming {
    fn query(&self) -> Option<Map> {
        Some(self.query.clone())
    }
}

let mut query = Map::new();
query.insert("page".to_string(), Value::from("2"));

let middleware = Middleware::new();
let req = middleware.bind(Rc::new(Incoming { query }));

req.validate_query("page").to_int(None)?.clamp(1.0, 100.0);
assert_eq!(req.vals().borrow().value("page"), Value::from(2.0));
# Ok::<(), vet::ValidationError>(())
```

Custom rules ride on the same core the built-ins use: write an extension
trait over [check_pred](Validator::check_pred) and
[tap](Validator::tap) and your methods chain like any other.

*/

pub mod bind;
pub mod chain;
pub mod error;
pub mod predicates;
pub mod value;

pub use bind::{Binding, Middleware, Request};
pub use chain::Validator;
pub use error::{Error, ValidationError};
pub use predicates::UuidVersion;
pub use value::{Map, Value, ValueBag};
