use serde::Deserialize;
use url::form_urlencoded;

use crate::pagination::Pagination;
use crate::schema::Id;

/// Recipe listing parameters. Parsed by hand because `tags` arrives as a
/// repeated query key (`?tags=breakfast&tags=dinner`), which the derived
/// deserializer cannot express.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeListQuery {
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
    pub page: Pagination,
}

impl RecipeListQuery {
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "tags" => parsed.tags.push(value.into_owned()),
                "author" => parsed.author = value.parse().ok(),
                "is_favorited" => parsed.is_favorited = parse_flag(&value),
                "is_in_shopping_cart" => parsed.is_in_shopping_cart = parse_flag(&value),
                "limit" => parsed.page.limit = value.parse().ok(),
                "offset" => parsed.page.offset = value.parse().ok(),
                _ => {}
            }
        }

        parsed
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "True" => Some(true),
        "0" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Ingredient listing: case-insensitive prefix search on the name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

/// Subscription listing: pagination plus an optional cap on the number
/// of recipes embedded per author.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub recipes_limit: Option<i64>,
}

impl SubscriptionsQuery {
    pub fn page(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_tags_collect_in_order() {
        let q = RecipeListQuery::parse("tags=breakfast&tags=dinner&author=7");
        assert_eq!(q.tags, vec!["breakfast", "dinner"]);
        assert_eq!(q.author, Some(7));
        assert_eq!(q.is_favorited, None);
    }

    #[test]
    fn membership_flags_accept_both_spellings() {
        let q = RecipeListQuery::parse("is_favorited=1&is_in_shopping_cart=false");
        assert_eq!(q.is_favorited, Some(true));
        assert_eq!(q.is_in_shopping_cart, Some(false));
    }

    #[test]
    fn empty_query_is_the_default() {
        assert_eq!(RecipeListQuery::parse(""), RecipeListQuery::default());
    }

    #[test]
    fn pagination_and_unknown_keys() {
        let q = RecipeListQuery::parse("limit=2&offset=4&order=abc");
        assert_eq!(q.page.limit, Some(2));
        assert_eq!(q.page.offset, Some(4));
    }

    #[test]
    fn percent_encoded_values_are_decoded() {
        let q = RecipeListQuery::parse("tags=s%C3%BC%C3%9F");
        assert_eq!(q.tags, vec!["süß"]);
    }
}
