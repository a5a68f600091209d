//! Filter state transitions.
//!
//! Each function computes the next [`FilterState`] from the current one.
//! They are pure; the session applies the result and runs the downstream
//! notification sequence.

use highway_plan_project_models::{District, FilterKind, FilterState};

use crate::FilterError;

/// Selects a county, replacing any active filter.
///
/// # Errors
///
/// * [`FilterError::EmptyValue`] if `name` is blank
pub fn select_county(name: &str) -> Result<FilterState, FilterError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FilterError::EmptyValue {
            kind: FilterKind::County,
        });
    }
    Ok(FilterState::County(name.to_string()))
}

/// Selects a district, replacing any active filter.
///
/// # Errors
///
/// * [`FilterError::InvalidDistrict`] if `number` is outside 1-12
pub fn select_district(number: i64) -> Result<FilterState, FilterError> {
    Ok(FilterState::District(District::new(number)?))
}

/// Selects a project-type category, replacing any active filter.
///
/// # Errors
///
/// * [`FilterError::EmptyValue`] if `category` is blank
pub fn select_project_type(category: &str) -> Result<FilterState, FilterError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(FilterError::EmptyValue {
            kind: FilterKind::ProjectType,
        });
    }
    Ok(FilterState::ProjectType(category.to_string()))
}

/// Clears the filter only if it belongs to `kind`.
#[must_use]
pub fn clear_current(current: &FilterState, kind: FilterKind) -> FilterState {
    if current.kind() == Some(kind) {
        FilterState::None
    } else {
        current.clone()
    }
}

/// Parses a district number typed by a user.
///
/// # Errors
///
/// * [`FilterError::InvalidInput`] if `input` is not an integer
/// * [`FilterError::InvalidDistrict`] if it is outside 1-12
pub fn parse_district(input: &str) -> Result<FilterState, FilterError> {
    let number = input
        .trim()
        .parse::<i64>()
        .map_err(|_| FilterError::InvalidInput {
            kind: FilterKind::District,
            input: input.to_string(),
        })?;
    select_district(number)
}
