/*!
This example validates a signup form the way a request handler would:
required fields fail fast, optional fields skip their whole chain when
absent, and the bag ends up holding only well-typed values.

It also shows how custom rules ride on the same core the built-ins use,
via a plain extension trait.
*/

use std::rc::Rc;

use vet::{Error, Map, Middleware, Request, ValidationError, Validator, Value};

struct Incoming {
    query: Map,
    body: Map,
}

impl Request for Incoming {
    fn query(&self) -> Option<Map> {
        Some(self.query.clone())
    }

    fn body(&self) -> Option<Map> {
        Some(self.body.clone())
    }
}

trait ValidatorExt<C> {
    /// Lowercase letters and dashes only, the shape of a URL slug.
    fn is_slug(&self, tip: Option<&str>) -> Result<&Self, ValidationError>;
}

impl<C> ValidatorExt<C> for Validator<C> {
    fn is_slug(&self, tip: Option<&str>) -> Result<&Self, ValidationError> {
        self.check_pred(
            |_, value| {
                value.as_str().is_some_and(|s| {
                    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c == '-')
                })
            },
            tip,
        )
    }
}

fn handle(req: &vet::Binding<Incoming>) -> Result<(), Error> {
    req.validate_body("username")
        .required(None)?
        .trim()
        .is_length(3, 16, None)?
        .is_alphanumeric(None)?;

    req.validate_body("email")
        .optional()
        .is_email(None)?
        .tap(|_, v| Ok(Value::from(v.to_string().to_lowercase())), None)?;

    req.validate_body("team")
        .default_to("general")
        .is_slug(Some("team must be a slug"))?;

    req.validate_query("invites")
        .optional()
        .to_ints(None)?
        .uniq();

    req.validate_query("page")
        .default_to("1")
        .to_int(None)?
        .clamp(1.0, 100.0);

    req.check(true, "signup window closed")?;
    Ok(())
}

fn main() {
    let mut body = Map::new();
    body.insert("username".to_string(), Value::from("  grace42 "));
    body.insert("email".to_string(), Value::from("Grace@Example.Com"));

    let mut query = Map::new();
    query.insert(
        "invites".to_string(),
        Value::Array(vec![Value::from("7"), Value::from("7"), Value::from("9")]),
    );

    let middleware = Middleware::new();
    let req = middleware.bind(Rc::new(Incoming { query, body }));

    match handle(&req) {
        Ok(()) => {
            let bag = req.vals();
            let bag = bag.borrow();
            let mut keys: Vec<&String> = bag.keys().collect();
            keys.sort();
            for key in keys {
                println!("{key} = {}", bag.value(key));
            }
            // email = grace@example.com
            // invites = 7,9
            // page = 1
            // team = general
            // username = grace42
        }
        Err(Error::Validation(err)) => println!("rejected: {err}"),
        Err(Error::Fatal(err)) => println!("blew up: {err}"),
    }
}
