//! Typed PostgREST query builder.
//!
//! Every predicate the services issue is a [`Filter`] variant, so a query is
//! assembled from a closed set of operators instead of ad-hoc strings.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, String),
    Neq(&'static str, String),
    In(&'static str, Vec<String>),
    Gte(&'static str, String),
    ILike(&'static str, String),
    IsTrue(&'static str),
    IsFalse(&'static str),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl fmt::Display) -> Self {
        Filter::Eq(column, value.to_string())
    }

    pub fn neq(column: &'static str, value: impl fmt::Display) -> Self {
        Filter::Neq(column, value.to_string())
    }

    pub fn any_of<I, V>(column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        Filter::In(column, values.into_iter().map(|v| v.to_string()).collect())
    }

    pub fn gte(column: &'static str, value: impl fmt::Display) -> Self {
        Filter::Gte(column, value.to_string())
    }

    /// Case-insensitive substring match.
    pub fn contains(column: &'static str, value: impl fmt::Display) -> Self {
        Filter::ILike(column, format!("*{}*", value))
    }

    fn render(&self) -> String {
        match self {
            Filter::Eq(col, v) => format!("{}=eq.{}", col, encode(v)),
            Filter::Neq(col, v) => format!("{}=neq.{}", col, encode(v)),
            Filter::In(col, values) => {
                let items: Vec<String> = values.iter().map(|v| encode(v)).collect();
                format!("{}=in.({})", col, items.join(","))
            }
            Filter::Gte(col, v) => format!("{}=gte.{}", col, encode(v)),
            Filter::ILike(col, v) => format!("{}=ilike.{}", col, encode(v)),
            Filter::IsTrue(col) => format!("{}=is.true", col),
            Filter::IsFalse(col) => format!("{}=is.false", col),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    Asc(&'static str),
    Desc(&'static str),
}

impl Order {
    fn render(&self) -> String {
        match self {
            Order::Asc(col) => format!("{}.asc", col),
            Order::Desc(col) => format!("{}.desc", col),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: &'static str,
    select: Option<&'static str>,
    filters: Vec<Filter>,
    order: Vec<Order>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Query {
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self, columns: &'static str) -> Self {
        self.select = Some(columns);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filter_opt(self, filter: Option<Filter>) -> Self {
        match filter {
            Some(f) => self.filter(f),
            None => self,
        }
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Path relative to the Supabase base URL, e.g.
    /// `/rest/v1/appointments?doctorId=eq.<id>&limit=1`.
    pub fn to_path(&self) -> String {
        let mut params: Vec<String> = Vec::new();

        if let Some(select) = self.select {
            params.push(format!("select={}", select));
        }
        params.extend(self.filters.iter().map(Filter::render));
        if !self.order.is_empty() {
            let order: Vec<String> = self.order.iter().map(Order::render).collect();
            params.push(format!("order={}", order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }
        if let Some(offset) = self.offset {
            params.push(format!("offset={}", offset));
        }

        if params.is_empty() {
            format!("/rest/v1/{}", self.table)
        } else {
            format!("/rest/v1/{}?{}", self.table, params.join("&"))
        }
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
