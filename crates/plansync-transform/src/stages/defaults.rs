//! Stage 5: default values.

use plansync_model::{DefaultValue, DestinationRecord};

/// Apply defaults in order, each according to its apply-when policy.
pub fn apply_default_values(defaults: &[DefaultValue], destination: &mut DestinationRecord) {
    for default in defaults {
        if default
            .apply_when
            .should_apply(destination.get(&default.destination_field))
        {
            destination.insert(default.destination_field.clone(), default.value.clone());
        }
    }
}
