pub mod error;
pub mod options;
pub mod sql;

pub use error::QueryError;
pub use options::{ListParams, ListQuery, ListSpec, Pagination, SortDirection};
pub use sql::{bind_query, bind_query_as, SqlParam, SqlWhere};
