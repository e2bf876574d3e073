const SCHEMA: &str = include_str!("../migrations/0001_clinic_schema.sql");

/// Text from `start` up to and including the next `end`.
fn section(start: &str, end: &str) -> &'static str {
    let from = SCHEMA.find(start).unwrap_or_else(|| panic!("schema has no {:?}", start));
    let len = SCHEMA[from..].find(end).unwrap_or_else(|| panic!("{:?} is not terminated", start));
    &SCHEMA[from..from + len + end.len()]
}

#[test]
fn booking_columns_are_paired_in_storage() {
    let slots = section("create table appointment_slots", "\n);");
    assert!(slots.contains("check ((patient_id is null) = (booked_at is null))"));
    assert!(slots.contains("exclude using gist"));
}

#[test]
fn deleting_a_patient_releases_bookings_as_a_pair() {
    let trigger = section("create trigger patients_release_slots", ";");
    assert!(trigger.contains("before delete on patients"));

    let function = section("function patients_release_slots()", "\n$$;");
    let updates: Vec<&str> = function.split("update appointment_slots").skip(1).collect();
    assert_eq!(updates.len(), 2);

    let booking = updates.iter().find(|u| u.contains("where patient_id = old.id")).unwrap();
    assert!(booking.contains("patient_id = null"));
    assert!(booking.contains("booked_at = null"));

    let hold = updates.iter().find(|u| u.contains("where reserved_by = old.id")).unwrap();
    assert!(hold.contains("reserved_by = null"));
    assert!(hold.contains("reserved_until = null"));
}

#[test]
fn a_new_hold_drops_the_patients_other_holds_with_that_doctor() {
    let function = section("function reserve_appointment_slot(", "\n$$;");
    assert!(function.contains("for update"));

    let release = function.split("update appointment_slots").nth(1).unwrap();
    assert!(release.contains("reserved_by = null"));
    assert!(release.contains("where doctor_id = v_slot.doctor_id"));
    assert!(release.contains("and reserved_by = p_patient_id"));
    assert!(release.contains("and id <> p_slot_id"));
}

#[test]
fn role_extensions_cascade_from_users() {
    for table in ["create table doctors", "create table patients"] {
        let statement = section(table, "\n);");
        assert!(statement.contains("references users (id) on delete cascade"), "{}", table);
    }
}
