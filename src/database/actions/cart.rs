use std::collections::BTreeMap;
use std::fmt::Write as _;

use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, ApiResult},
    schema::{CartPart, Id, ShoppingListRow, User},
};

pub async fn is_in_cart(recipe_id: Id, user_id: Id, pool: &Pool<Postgres>) -> ApiResult<bool> {
    let row: Option<(Id,)> =
        sqlx::query_as("SELECT recipe_id FROM shopping_cart WHERE recipe_id = $1 AND user_id = $2")
            .bind(recipe_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub async fn add_to_cart(recipe_id: Id, user_id: Id, pool: &Pool<Postgres>) -> ApiResult<()> {
    let result = sqlx::query(
        "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    super::toggled(
        result.rows_affected(),
        ApiError::conflict("recipe is already in the shopping cart"),
    )
}

pub async fn remove_from_cart(recipe_id: Id, user_id: Id, pool: &Pool<Postgres>) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    super::toggled(
        result.rows_affected(),
        ApiError::not_found("recipe is not in the shopping cart"),
    )
}

/// Every (ingredient, amount) pair from every recipe in the user's cart,
/// ungrouped. A recipe appearing once contributes each of its pairs once.
pub async fn list_cart_parts(user_id: Id, pool: &Pool<Postgres>) -> ApiResult<Vec<CartPart>> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Groups cart parts by ingredient identity (name + unit) and sums the
/// amounts within each group. Output is ordered by name for a stable
/// document.
pub fn aggregate_parts(parts: Vec<CartPart>) -> Vec<ShoppingListRow> {
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();
    for part in parts {
        *groups
            .entry((part.name, part.measurement_unit))
            .or_insert(0) += i64::from(part.amount);
    }

    groups
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListRow {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

/// Renders the downloadable document: a header naming the user, then one
/// line per ingredient group.
pub fn render_shopping_list(user: &User, rows: &[ShoppingListRow]) -> String {
    let mut document = format!("Shopping list for: {}\n\n", user.full_name());
    for row in rows {
        let _ = writeln!(
            document,
            "- {} ({}) - {}",
            row.name, row.measurement_unit, row.total
        );
    }
    document
}

/// Turns the collected cart parts into the export document. An empty
/// cart is a client error, never an empty document.
pub fn shopping_list_from_parts(user: &User, parts: Vec<CartPart>) -> ApiResult<String> {
    if parts.is_empty() {
        return Err(ApiError::EmptyCart);
    }

    let rows = aggregate_parts(parts);
    Ok(render_shopping_list(user, &rows))
}

pub async fn build_shopping_list(user: &User, pool: &Pool<Postgres>) -> ApiResult<String> {
    let parts = list_cart_parts(user.id, pool).await?;
    shopping_list_from_parts(user, parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(name: &str, unit: &str, amount: i32) -> CartPart {
        CartPart {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn user() -> User {
        User {
            id: 1,
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: String::new(),
        }
    }

    #[test]
    fn overlapping_ingredients_sum_across_recipes() {
        // Recipe1 (flour:200, sugar:50) and Recipe2 (flour:100, egg:2).
        let rows = aggregate_parts(vec![
            part("flour", "g", 200),
            part("sugar", "g", 50),
            part("flour", "g", 100),
            part("egg", "pcs", 2),
        ]);

        assert_eq!(
            rows,
            vec![
                ShoppingListRow {
                    name: "egg".to_string(),
                    measurement_unit: "pcs".to_string(),
                    total: 2
                },
                ShoppingListRow {
                    name: "flour".to_string(),
                    measurement_unit: "g".to_string(),
                    total: 300
                },
                ShoppingListRow {
                    name: "sugar".to_string(),
                    measurement_unit: "g".to_string(),
                    total: 50
                },
            ]
        );
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let rows = aggregate_parts(vec![part("milk", "ml", 200), part("milk", "tbsp", 2)]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].measurement_unit, "ml");
        assert_eq!(rows[1].measurement_unit, "tbsp");
    }

    #[test]
    fn amounts_sum_without_overflowing_small_ints() {
        let rows = aggregate_parts(vec![
            part("rice", "g", i32::MAX),
            part("rice", "g", i32::MAX),
        ]);
        assert_eq!(rows[0].total, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn an_empty_cart_is_an_error_not_a_document() {
        assert!(matches!(
            shopping_list_from_parts(&user(), vec![]),
            Err(ApiError::EmptyCart)
        ));
    }

    #[test]
    fn a_single_part_cart_renders_a_document() {
        let document = shopping_list_from_parts(&user(), vec![part("flour", "g", 200)]).unwrap();
        assert!(document.contains("- flour (g) - 200\n"));
    }

    #[test]
    fn document_has_header_and_one_line_per_group() {
        let rows = aggregate_parts(vec![
            part("flour", "g", 200),
            part("flour", "g", 100),
            part("egg", "pcs", 2),
        ]);
        let document = render_shopping_list(&user(), &rows);

        assert!(document.starts_with("Shopping list for: Ada Lovelace\n\n"));
        assert!(document.contains("- flour (g) - 300\n"));
        assert!(document.contains("- egg (pcs) - 2\n"));
        assert_eq!(document.lines().filter(|l| l.starts_with("- ")).count(), 2);
    }
}
