//! Stage 4: code translation through lookup tables.

use plansync_model::{DestinationRecord, FieldValue, LookupMapping, LookupTable, SourceRecord};
use tracing::debug;

/// Resolve every lookup mapping against the source record.
///
/// An absent or null source value, or a miss in an inline table, writes the
/// mapping's default (null when it has none). External tables are not
/// resolved by the engine; the raw source value is written unchanged.
pub fn apply_lookup_mappings(
    lookups: &[LookupMapping],
    source: &SourceRecord,
    destination: &mut DestinationRecord,
) {
    for lookup in lookups {
        let fallback = || lookup.default.clone().unwrap_or_default();
        let resolved = match source.get(&lookup.source_field) {
            None | Some(FieldValue::Null) => fallback(),
            Some(value) => match &lookup.table {
                LookupTable::Inline(table) => table
                    .get(&value.to_string())
                    .cloned()
                    .unwrap_or_else(fallback),
                LookupTable::External(reference) => {
                    debug!(
                        field = %lookup.source_field,
                        table = %reference,
                        "external lookup table not resolved, passing source value through"
                    );
                    value.clone()
                }
            },
        };
        destination.insert(lookup.destination_field.clone(), resolved);
    }
}
