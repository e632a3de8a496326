//! Shared pieces of paginated list queries.
//!
//! Each repository writes one `push_filters` function that appends its
//! predicates through [`Conditions`]. The same function feeds both the
//! `COUNT(*)` query and the page query, so the total always describes exactly
//! the rows that paging walks through.

use sqlx::{Postgres, QueryBuilder};
use tireshop_core::listing::{PageRequest, Sort, like_pattern};

/// Appends `WHERE`/`AND` between predicates as they are pushed.
pub struct Conditions<'q, 'b> {
    builder: &'b mut QueryBuilder<'q, Postgres>,
    any: bool,
}

impl<'q, 'b> Conditions<'q, 'b> {
    pub fn new(builder: &'b mut QueryBuilder<'q, Postgres>) -> Self {
        Self {
            builder,
            any: false,
        }
    }

    /// Start a new conjunct and return the builder to write it.
    pub fn next(&mut self) -> &mut QueryBuilder<'q, Postgres> {
        self.builder
            .push(if self.any { " AND " } else { " WHERE " });
        self.any = true;
        self.builder
    }

    /// `column = value`
    pub fn eq<T>(&mut self, column: &str, value: T)
    where
        T: 'q + sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send,
    {
        self.next().push(column).push(" = ").push_bind(value);
    }

    /// `column >= value`
    pub fn gte<T>(&mut self, column: &str, value: T)
    where
        T: 'q + sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send,
    {
        self.next().push(column).push(" >= ").push_bind(value);
    }

    /// `column <= value`
    pub fn lte<T>(&mut self, column: &str, value: T)
    where
        T: 'q + sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send,
    {
        self.next().push(column).push(" <= ").push_bind(value);
    }

    /// Raw predicate with no bound values.
    pub fn raw(&mut self, predicate: &str) {
        self.next().push(predicate);
    }

    /// Case-insensitive substring match of `term` against any of `columns`.
    pub fn search(&mut self, columns: &[&str], term: &str) {
        let pattern = like_pattern(term);
        let builder = self.next();
        builder.push("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push(*column)
                .push(" ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        builder.push(")");
    }
}

/// Append `ORDER BY … LIMIT … OFFSET …`.
pub fn push_page(builder: &mut QueryBuilder<'_, Postgres>, sort: Sort, page: PageRequest) {
    builder
        .push(" ORDER BY ")
        .push(sort.to_sql())
        .push(" LIMIT ")
        .push_bind(i64::from(page.limit()))
        .push(" OFFSET ")
        .push_bind(page.offset());
}

#[cfg(test)]
mod tests {
    use tireshop_core::listing::SortOrder;

    use super::*;

    #[test]
    fn test_conditions_join_with_where_then_and() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM product p");
        let mut cond = Conditions::new(&mut qb);
        cond.eq("p.is_active", true);
        cond.search(&["p.name", "p.sku"], "pilot");
        cond.raw("p.stock_quantity > 0");
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM product p WHERE p.is_active = $1 AND \
             (p.name ILIKE $2 ESCAPE '\\' OR p.sku ILIKE $3 ESCAPE '\\') AND p.stock_quantity > 0"
        );
    }

    #[test]
    fn test_no_conditions_means_no_where() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM brand b");
        let _cond = Conditions::new(&mut qb);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM brand b");
    }

    #[test]
    fn test_page_clause() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM brand b");
        let sort = Sort {
            column: "b.name",
            order: SortOrder::Asc,
        };
        push_page(&mut qb, sort, PageRequest::new(3, 10));
        assert_eq!(
            qb.sql(),
            "SELECT * FROM brand b ORDER BY b.name ASC LIMIT $1 OFFSET $2"
        );
    }
}
