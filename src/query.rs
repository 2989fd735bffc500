use serde::Deserialize;

use crate::models::Role;

/// SortOrder
///
/// Direction of a directory listing. Anything other than a case-insensitive `DESC`
/// is treated as ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// SortField
///
/// A column a listing may be ordered by. `key` is the public query-string name and
/// `column` the SQL expression it maps to. Both are static, so user input never reaches
/// the ORDER BY clause.
pub trait SortField: Copy + PartialEq + 'static {
    fn key(&self) -> &'static str;
    fn column(&self) -> &'static str;
}

/// Sort
///
/// Single-key ordering. Ties always break by `id` ascending so results are
/// deterministic across both repository implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub order: SortOrder,
}

impl<F: SortField> Sort<F> {
    /// Resolves `orderBy`/`order` against an allow-list. Unknown or missing fields fall
    /// back to `default` instead of being rejected.
    pub fn resolve(order_by: Option<&str>, order: Option<&str>, allowed: &[F], default: F) -> Self {
        let field = order_by
            .map(str::trim)
            .and_then(|requested| allowed.iter().copied().find(|f| f.key() == requested))
            .unwrap_or(default);
        Sort {
            field,
            order: SortOrder::parse_lenient(order),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortField {
    Id,
    Name,
    Email,
    Address,
    Role,
}

impl UserSortField {
    pub const ALLOWED: [UserSortField; 5] = [
        UserSortField::Id,
        UserSortField::Name,
        UserSortField::Email,
        UserSortField::Address,
        UserSortField::Role,
    ];
}

impl SortField for UserSortField {
    fn key(&self) -> &'static str {
        match self {
            UserSortField::Id => "id",
            UserSortField::Name => "name",
            UserSortField::Email => "email",
            UserSortField::Address => "address",
            UserSortField::Role => "role",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            UserSortField::Id => "id",
            UserSortField::Name => "name",
            UserSortField::Email => "email",
            UserSortField::Address => "address",
            // Order by the label, not the enum's declaration order.
            UserSortField::Role => "role::text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSortField {
    Id,
    Name,
    Email,
    Address,
    AverageRating,
}

impl StoreSortField {
    /// Sort keys accepted by the public store listing.
    pub const PUBLIC: [StoreSortField; 4] = [
        StoreSortField::Id,
        StoreSortField::Name,
        StoreSortField::Address,
        StoreSortField::AverageRating,
    ];

    /// Sort keys accepted by the admin store listing.
    pub const ADMIN: [StoreSortField; 5] = [
        StoreSortField::Id,
        StoreSortField::Name,
        StoreSortField::Email,
        StoreSortField::Address,
        StoreSortField::AverageRating,
    ];
}

impl SortField for StoreSortField {
    fn key(&self) -> &'static str {
        match self {
            StoreSortField::Id => "id",
            StoreSortField::Name => "name",
            StoreSortField::Email => "email",
            StoreSortField::Address => "address",
            StoreSortField::AverageRating => "averageRating",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            StoreSortField::Id => "s.id",
            StoreSortField::Name => "s.name",
            StoreSortField::Email => "s.email",
            StoreSortField::Address => "s.address",
            StoreSortField::AverageRating => "average_rating",
        }
    }
}

/// UserFilter
///
/// Case-insensitive substring filters for the user directory. Empty strings are
/// treated as "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
}

/// StoreFilter
///
/// Case-insensitive substring filters for store listings. The public listing only
/// exposes `name` and `address`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Trims a filter term and drops it if nothing is left.
pub fn normalize_term(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Case-insensitive substring match used by the in-memory repository; mirrors `ILIKE
/// '%term%'`.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn role_matches(role: Role, needle: &str) -> bool {
    contains_ci(role.as_str(), needle)
}

// --- Query-string shapes ---

/// UserQuery
///
/// Raw query string of `GET /api/admin/users`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    /// One of id, name, email, address, role. Falls back to name.
    pub order_by: Option<String>,
    /// ASC or DESC. Falls back to ASC.
    pub order: Option<String>,
}

impl UserQuery {
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            name: normalize_term(self.name.clone()),
            email: normalize_term(self.email.clone()),
            address: normalize_term(self.address.clone()),
            role: normalize_term(self.role.clone()),
        }
    }

    pub fn sort(&self) -> Sort<UserSortField> {
        Sort::resolve(
            self.order_by.as_deref(),
            self.order.as_deref(),
            &UserSortField::ALLOWED,
            UserSortField::Name,
        )
    }
}

/// StoreQuery
///
/// Raw query string of the store listings. `email` is ignored by the public listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StoreQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// One of id, name, address, averageRating (admin also accepts email).
    pub order_by: Option<String>,
    /// ASC or DESC. Falls back to ASC.
    pub order: Option<String>,
}

impl StoreQuery {
    pub fn public_filter(&self) -> StoreFilter {
        StoreFilter {
            name: normalize_term(self.name.clone()),
            email: None,
            address: normalize_term(self.address.clone()),
        }
    }

    pub fn admin_filter(&self) -> StoreFilter {
        StoreFilter {
            email: normalize_term(self.email.clone()),
            ..self.public_filter()
        }
    }

    pub fn public_sort(&self) -> Sort<StoreSortField> {
        Sort::resolve(
            self.order_by.as_deref(),
            self.order.as_deref(),
            &StoreSortField::PUBLIC,
            StoreSortField::Name,
        )
    }

    pub fn admin_sort(&self) -> Sort<StoreSortField> {
        Sort::resolve(
            self.order_by.as_deref(),
            self.order.as_deref(),
            &StoreSortField::ADMIN,
            StoreSortField::Name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_field_falls_back_to_default() {
        let sort = Sort::resolve(
            Some("password"),
            Some("sideways"),
            &UserSortField::ALLOWED,
            UserSortField::Name,
        );
        assert_eq!(sort.field, UserSortField::Name);
        assert_eq!(sort.order, SortOrder::Asc);
    }

    #[test]
    fn email_sort_is_admin_only_for_stores() {
        let q = StoreQuery {
            order_by: Some("email".into()),
            order: Some("desc".into()),
            ..Default::default()
        };
        assert_eq!(q.public_sort().field, StoreSortField::Name);
        assert_eq!(q.admin_sort().field, StoreSortField::Email);
        assert_eq!(q.admin_sort().order, SortOrder::Desc);
    }

    #[test]
    fn blank_filters_are_dropped() {
        let q = StoreQuery {
            name: Some("   ".into()),
            address: Some("  Main St ".into()),
            email: Some("a@b.c".into()),
            ..Default::default()
        };
        let f = q.public_filter();
        assert_eq!(f.name, None);
        assert_eq!(f.address.as_deref(), Some("Main St"));
        assert_eq!(f.email, None);
    }
}
