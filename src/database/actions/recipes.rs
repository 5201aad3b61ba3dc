use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{ApiError, ApiResult},
    filter::RecipeListQuery,
    pagination::PageContext,
    schema::{
        Id, IngredientAmount, Recipe, RecipeDetail, RecipeIngredient, RecipeInput, RecipeListRow,
        ShortRecipe, Tag,
    },
};

use super::{cart, favorites, users};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> ApiResult<Option<Recipe>> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_short_recipe(id: Id, pool: &Pool<Postgres>) -> ApiResult<ShortRecipe> {
    let row: Option<ShortRecipe> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    row.ok_or_else(|| ApiError::not_found("no recipe exists with the specified id"))
}

/// Resolves a recipe for mutation. Only the author may modify it.
pub async fn get_recipe_owned(id: Id, author_id: Id, pool: &Pool<Postgres>) -> ApiResult<Recipe> {
    match get_recipe(id, pool).await? {
        Some(recipe) if recipe.author_id == author_id => Ok(recipe),
        Some(_) => Err(ApiError::Forbidden(
            "only the author can modify this recipe".to_string(),
        )),
        None => Err(ApiError::not_found("no recipe exists with the specified id")),
    }
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Postgres>) -> ApiResult<Vec<Tag>> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.slug
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_recipe_ingredients(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> ApiResult<Vec<RecipeIngredient>> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Validates the flat write shape before anything touches the store.
/// Returns the tag set deduplicated, in input order.
pub fn validate_recipe_input(input: &RecipeInput) -> ApiResult<Vec<Id>> {
    if input.name.trim().is_empty() {
        return Err(ApiError::validation("recipe name must not be empty"));
    }
    if input.text.trim().is_empty() {
        return Err(ApiError::validation("recipe text must not be empty"));
    }
    if input.cooking_time < 1 {
        return Err(ApiError::validation(
            "cooking time must be 1 minute or more",
        ));
    }
    if input.tags.is_empty() {
        return Err(ApiError::validation("at least one tag is required"));
    }
    if input.ingredients.is_empty() {
        return Err(ApiError::validation("at least one ingredient is required"));
    }

    let mut seen = HashSet::new();
    for part in &input.ingredients {
        if part.amount < 1 {
            return Err(ApiError::validation("ingredient amount must be 1 or more"));
        }
        if !seen.insert(part.id) {
            return Err(ApiError::validation(
                "ingredients in a recipe must be unique",
            ));
        }
    }

    let mut tags = Vec::new();
    for tag in &input.tags {
        if !tags.contains(tag) {
            tags.push(*tag);
        }
    }

    Ok(tags)
}

/// What an ingredient replacement has to do: prior associations not in
/// the desired list are removed, the rest are written with their desired
/// amounts, creating new rows and updating amounts on retained ones.
#[derive(Debug, PartialEq, Eq)]
pub struct ReplacementPlan {
    pub remove: Vec<Id>,
    pub upsert: Vec<IngredientAmount>,
}

pub fn plan_replacement(current: &[Id], desired: &[IngredientAmount]) -> ReplacementPlan {
    let keep: HashSet<Id> = desired.iter().map(|part| part.id).collect();
    let remove = current
        .iter()
        .copied()
        .filter(|id| !keep.contains(id))
        .collect();

    ReplacementPlan {
        remove,
        upsert: desired.to_vec(),
    }
}

/// Replaces the recipe's tag and ingredient associations with exactly the
/// desired sets. Runs inside the caller's transaction so that a failure
/// anywhere rolls back every association change at once.
async fn replace_associations(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    tags: &[Id],
    ingredients: &[IngredientAmount],
) -> ApiResult<()> {
    let (known_tags,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_one(&mut **tx)
        .await?;
    if known_tags != tags.len() as i64 {
        return Err(ApiError::not_found("unknown tag id"));
    }

    let ids: Vec<Id> = ingredients.iter().map(|part| part.id).collect();
    let (known_ingredients,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_one(&mut **tx)
            .await?;
    if known_ingredients != ids.len() as i64 {
        return Err(ApiError::not_found("unknown ingredient id"));
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::INT4[])")
        .bind(recipe_id)
        .bind(tags)
        .execute(&mut **tx)
        .await?;

    let current: Vec<(Id,)> =
        sqlx::query_as("SELECT ingredient_id FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_all(&mut **tx)
            .await?;
    let current: Vec<Id> = current.into_iter().map(|row| row.0).collect();

    let plan = plan_replacement(&current, ingredients);

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1 AND ingredient_id = ANY($2)")
        .bind(recipe_id)
        .bind(&plan.remove)
        .execute(&mut **tx)
        .await?;

    for part in &plan.upsert {
        sqlx::query(
            "
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (recipe_id, ingredient_id) DO UPDATE SET amount = EXCLUDED.amount
        ",
        )
        .bind(recipe_id)
        .bind(part.id)
        .bind(part.amount)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Creates a recipe and its associations as one atomic unit.
/// `image` is the stored media path, already decoded by the handler.
pub async fn create_recipe(
    author_id: Id,
    input: &RecipeInput,
    image: String,
    pool: &Pool<Postgres>,
) -> ApiResult<Id> {
    let tags = validate_recipe_input(input)?;

    let mut tx = pool.begin().await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&input.name)
    .bind(image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    replace_associations(&mut tx, id.0, &tags, &input.ingredients).await?;

    tx.commit().await?;

    Ok(id.0)
}

/// Updates a recipe's scalar columns and replaces both association sets,
/// all inside one transaction. `image` is None when the caller keeps the
/// stored image.
pub async fn update_recipe(
    recipe: &Recipe,
    input: &RecipeInput,
    image: Option<String>,
    pool: &Pool<Postgres>,
) -> ApiResult<()> {
    let tags = validate_recipe_input(input)?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "
        UPDATE recipes
        SET name = $1, image = $2, text = $3, cooking_time = $4
        WHERE id = $5
    ",
    )
    .bind(&input.name)
    .bind(image.unwrap_or_else(|| recipe.image.clone()))
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(recipe.id)
    .execute(&mut *tx)
    .await?;

    replace_associations(&mut tx, recipe.id, &tags, &input.ingredients).await?;

    tx.commit().await?;

    Ok(())
}

/// Deletes a recipe. Association, favorite and cart rows go with it
/// through the cascade rules in the schema.
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> ApiResult<()> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

async fn build_detail(
    recipe: Recipe,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> ApiResult<RecipeDetail> {
    let tags = list_recipe_tags(recipe.id, pool).await?;
    let ingredients = list_recipe_ingredients(recipe.id, pool).await?;
    let author = users::get_profile(recipe.author_id, viewer, pool).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            favorites::is_favorite(recipe.id, user_id, pool).await?,
            cart::is_in_cart(recipe.id, user_id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeDetail {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

/// Nested read representation of a single recipe.
pub async fn get_recipe_detail(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> ApiResult<RecipeDetail> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("no recipe exists with the specified id"))?;

    build_detail(recipe, viewer, pool).await
}

/// Filtered, paginated listing, newest first. Membership filters are
/// ignored for anonymous viewers.
pub async fn fetch_recipe_page(
    query: &RecipeListQuery,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> ApiResult<PageContext<RecipeDetail>> {
    let limit = query.page.limit();
    let offset = query.page.offset();

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date, \
         COUNT(*) OVER() AS count FROM recipes r WHERE TRUE",
    );

    if let Some(author) = query.author {
        qb.push(" AND r.author_id = ").push_bind(author);
    }
    if !query.tags.is_empty() {
        qb.push(
            " AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt \
             INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug = ANY(",
        )
        .push_bind(query.tags.clone())
        .push("))");
    }
    if let Some(user_id) = viewer {
        if query.is_favorited == Some(true) {
            qb.push(" AND r.id IN (SELECT recipe_id FROM favorite_recipes WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if query.is_in_shopping_cart == Some(true) {
            qb.push(" AND r.id IN (SELECT recipe_id FROM shopping_cart WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }

    qb.push(" ORDER BY r.pub_date DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<RecipeListRow> = qb.build_query_as().fetch_all(pool).await?;

    let total_rows = rows.first().map(|r| r.count).unwrap_or(0);
    let mut details = Vec::with_capacity(rows.len());
    for row in rows {
        details.push(build_detail(Recipe::from(row), viewer, pool).await?);
    }

    Ok(PageContext::from_rows(details, total_rows, limit, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RecipeInput {
        RecipeInput {
            name: "Pancakes".to_string(),
            text: "Mix and fry.".to_string(),
            cooking_time: 20,
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmount { id: 1, amount: 200 },
                IngredientAmount { id: 2, amount: 50 },
            ],
            image: None,
        }
    }

    #[test]
    fn a_complete_input_passes() {
        assert_eq!(validate_recipe_input(&input()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn empty_tag_list_is_rejected() {
        let mut bad = input();
        bad.tags.clear();
        assert!(matches!(
            validate_recipe_input(&bad),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        let mut bad = input();
        bad.ingredients.clear();
        assert!(matches!(
            validate_recipe_input(&bad),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_ingredient_ids_fail_before_any_mutation() {
        let mut bad = input();
        bad.ingredients.push(IngredientAmount { id: 1, amount: 3 });
        assert!(matches!(
            validate_recipe_input(&bad),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn zero_amount_and_zero_cooking_time_are_rejected() {
        let mut bad = input();
        bad.ingredients[0].amount = 0;
        assert!(validate_recipe_input(&bad).is_err());

        let mut bad = input();
        bad.cooking_time = 0;
        assert!(validate_recipe_input(&bad).is_err());
    }

    #[test]
    fn replacement_drops_removed_retains_and_adds() {
        // Stored {1:2, 2:3}, desired {1:2, 3:1}.
        let desired = vec![
            IngredientAmount { id: 1, amount: 2 },
            IngredientAmount { id: 3, amount: 1 },
        ];
        let plan = plan_replacement(&[1, 2], &desired);

        assert_eq!(plan.remove, vec![2]);
        assert_eq!(plan.upsert, desired);

        // Applying the plan to the stored state leaves exactly the
        // desired associations.
        let mut state = std::collections::BTreeMap::from([(1, 2), (2, 3)]);
        for id in &plan.remove {
            state.remove(id);
        }
        for part in &plan.upsert {
            state.insert(part.id, part.amount);
        }
        assert_eq!(state, std::collections::BTreeMap::from([(1, 2), (3, 1)]));
    }

    #[test]
    fn an_unchanged_replacement_removes_nothing() {
        let desired = vec![IngredientAmount { id: 5, amount: 10 }];
        let plan = plan_replacement(&[5], &desired);
        assert!(plan.remove.is_empty());
        assert_eq!(plan.upsert, desired);
    }

    #[test]
    fn duplicate_tags_are_deduplicated_not_rejected() {
        let mut dup = input();
        dup.tags = vec![2, 1, 2];
        assert_eq!(validate_recipe_input(&dup).unwrap(), vec![2, 1]);
    }
}
