pub mod cart;
pub mod favorites;
pub mod follows;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;

use crate::error::{ApiError, ApiResult};

/// Outcome of a membership toggle statement. The unique constraint is
/// the single source of truth: an insert or delete that changed no rows
/// means the store was already in the requested state, which is the
/// `already` error rather than a silent success or a duplicate row.
pub(crate) fn toggled(rows_affected: u64, already: ApiError) -> ApiResult<()> {
    if rows_affected == 0 {
        Err(already)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::toggled;
    use crate::error::ApiError;

    #[test]
    fn an_add_that_inserted_a_row_succeeds() {
        assert!(toggled(1, ApiError::conflict("already a member")).is_ok());
    }

    #[test]
    fn a_second_add_is_a_conflict_not_a_second_row() {
        assert!(matches!(
            toggled(0, ApiError::conflict("already a member")),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn removing_a_non_member_is_not_found_not_a_silent_success() {
        assert!(matches!(
            toggled(0, ApiError::not_found("not a member")),
            Err(ApiError::NotFound(_))
        ));
    }
}
