//! Catalog of entity-name suffixes that belong to an mmWave presence sensor.
//!
//! The configurator only ever displays entities whose id ends with one of
//! these attribute names. The list mirrors what the frontend requests.

/// Attribute-name suffixes recognised as mmWave sensor entities.
pub const MMWAVE_SUFFIXES: &[&str] = &[
    // Zone coordinates
    "zone_1_begin_x",
    "zone_1_begin_y",
    "zone_1_end_x",
    "zone_1_end_y",
    "zone_2_begin_x",
    "zone_2_begin_y",
    "zone_2_end_x",
    "zone_2_end_y",
    "zone_3_begin_x",
    "zone_3_begin_y",
    "zone_3_end_x",
    "zone_3_end_y",
    "zone_4_begin_x",
    "zone_4_begin_y",
    "zone_4_end_x",
    "zone_4_end_y",
    // Entry zone coordinates
    "entry_zone_1_begin_x",
    "entry_zone_1_begin_y",
    "entry_zone_1_end_x",
    "entry_zone_1_end_y",
    "entry_zone_2_begin_x",
    "entry_zone_2_begin_y",
    "entry_zone_2_end_x",
    "entry_zone_2_end_y",
    // Target tracking
    "target_1_active",
    "target_2_active",
    "target_3_active",
    "target_1_x",
    "target_1_y",
    "target_1_speed",
    "target_1_resolution",
    "target_2_x",
    "target_2_y",
    "target_2_speed",
    "target_2_resolution",
    "target_3_x",
    "target_3_y",
    "target_3_speed",
    "target_3_resolution",
    "target_1_angle",
    "target_2_angle",
    "target_3_angle",
    "target_1_distance",
    "target_2_distance",
    "target_3_distance",
    // Zone occupancy off delay
    "zone_1_occupancy_off_delay",
    "zone_2_occupancy_off_delay",
    "zone_3_occupancy_off_delay",
    "zone_4_occupancy_off_delay",
    // Configured values
    "max_distance",
    "installation_angle",
    // Entry/exit diagnostics
    "assumed_present",
    "assumed_present_remaining_s",
    // Occupancy masks (exclusion zones)
    "occupancy_mask_1_begin_x",
    "occupancy_mask_1_begin_y",
    "occupancy_mask_1_end_x",
    "occupancy_mask_1_end_y",
    "occupancy_mask_2_begin_x",
    "occupancy_mask_2_begin_y",
    "occupancy_mask_2_end_x",
    "occupancy_mask_2_end_y",
    // Settings
    "bluetooth_switch",
    "inverse_mounting",
    "aggressive_target_clearing",
    "off_delay",
    "zone_1_off_delay",
    "zone_2_off_delay",
    "zone_3_off_delay",
    "zone_4_off_delay",
    "aggressive_timeout",
    "illuminance_offset_ui",
    "illuminance_offset",
    "esp32_led",
    "status_led",
    // Entry/exit settings
    "entry_exit_enabled",
    "assume_present_timeout_s",
    "exit_threshold_pct",
];

/// Returns `true` if `entity_id` names an mmWave sensor attribute.
///
/// Empty ids are never eligible.
#[must_use]
pub fn is_mmwave_entity(entity_id: &str) -> bool {
    !entity_id.is_empty()
        && MMWAVE_SUFFIXES
            .iter()
            .any(|suffix| entity_id.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_coordinate_is_eligible() {
        assert!(is_mmwave_entity("number.office_ep_zone_1_begin_x"));
        assert!(is_mmwave_entity("sensor.lounge_target_3_distance"));
    }

    #[test]
    fn settings_entities_are_eligible() {
        assert!(is_mmwave_entity("switch.hall_esp32_led"));
        assert!(is_mmwave_entity("select.hall_exit_threshold_pct"));
    }

    #[test]
    fn unrelated_entity_is_not_eligible() {
        assert!(!is_mmwave_entity("light.kitchen"));
        assert!(!is_mmwave_entity("sensor.outdoor_temperature"));
    }

    #[test]
    fn empty_id_is_not_eligible() {
        assert!(!is_mmwave_entity(""));
    }
}
