//! Services: query documents and model CRUD, both compiled to bound statements and run through a
//! [`StatementExecutor`].

mod crud;
mod executor;
mod query;
mod validation;
pub use crud::{
    delete_query, insert_query, json_literal, list_query, read_query, update_query, CrudService,
    DEFAULT_LIMIT, MAX_LIMIT,
};
pub use executor::{row_to_json, PgExecutor, StatementExecutor};
pub use query::{QueryOutcome, QueryService};
pub use validation::RequestValidator;
