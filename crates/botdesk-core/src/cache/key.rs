use std::fmt;

use botdesk_api::{EntityId, ListParams};

/// What a cached read covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryScope {
    List(ListParams),
    Detail(EntityId),
}

/// Cache address of a read: entity kind plus scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub entity: &'static str,
    pub scope: QueryScope,
}

impl QueryKey {
    pub fn list(entity: &'static str, params: ListParams) -> Self {
        Self {
            entity,
            scope: QueryScope::List(params),
        }
    }

    pub fn detail(entity: &'static str, id: EntityId) -> Self {
        Self {
            entity,
            scope: QueryScope::Detail(id),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.scope, QueryScope::List(_))
    }

    pub fn is_detail_of(&self, id: &EntityId) -> bool {
        matches!(&self.scope, QueryScope::Detail(d) if d == id)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            QueryScope::List(params) => {
                write!(f, "{}/list", self.entity)?;
                let mut sep = '?';
                for (name, value) in params.to_query() {
                    write!(f, "{sep}{name}={value}")?;
                    sep = '&';
                }
                Ok(())
            }
            QueryScope::Detail(id) => write!(f, "{}/detail/{id}", self.entity),
        }
    }
}
