//! Geographic reference entities (countries, their states, and the states'
//! cities) plus admin accounts and the API audit log.

mod admin_user;
mod api_log;
mod city;
mod country;
mod state;

pub use admin_user::{check_password, AdminUserChanges, AdminUserInput, AdminUserModel, ProfileInput};
pub use api_log::{ApiLogInput, ApiLogModel};
pub use city::{CityInput, CityModel, CityWithState};
pub use country::{CountryInput, CountryModel};
pub use state::{StateInput, StateModel, StateWithCountry};

use crate::query::RecordError;
use crate::schema::{Entity, EntitySchema};

/// Every table the crate owns, parents before children.
pub fn all_schemas() -> [&'static EntitySchema; 5] {
    [
        CountryModel::schema(),
        StateModel::schema(),
        CityModel::schema(),
        AdminUserModel::schema(),
        ApiLogModel::schema(),
    ]
}

/// Character-count bounds check shared by the input types.
pub(crate) fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), RecordError> {
    let len = value.chars().count();
    if len < min || len > max {
        let expected = if min == max {
            format!("exactly {min}")
        } else {
            format!("between {min} and {max}")
        };
        return Err(RecordError::Validation(format!(
            "{field} must be {expected} characters long (got {len})"
        )));
    }
    Ok(())
}
