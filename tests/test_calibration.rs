use approx::assert_relative_eq;
use ascat_l1b::core::calibrate::{
    select_table, tables, CalibrationDirection, CellInterpolation, SzfCalibrator, BEAMS,
};
use ascat_l1b::core::time::CalendarTime;
use ascat_l1b::{NodeMetadata, SzfNode, Version};

fn node(beam: usize, incidence: f64, sigma0: f64) -> SzfNode {
    SzfNode {
        epoch: 0.0,
        time: CalendarTime::new(2000, 1, 1, 0, 0, 0),
        track: 0.0,
        sigma0,
        incidence,
        azimuth: 0.0,
        latitude: 0.0,
        longitude: 0.0,
        atmospheric_height: 0.0,
        atmospheric_loss: 0.0,
        synthetic_flag: 0,
        reference_flag: 0,
        orbit_flag: 0,
        general_flag_1: 0,
        general_flag_2: 0,
        index: 0,
        beam,
        metadata: NodeMetadata {
            processor_version: Version::new(5, 2),
            satellite: 2,
            orbit: 1,
            ascending: true,
        },
    }
}

#[test]
fn test_floor_cell_stays_in_swath_half() {
    for beam in 0..BEAMS {
        for step in 0..=1200 {
            let incidence = f64::from(step) * 0.1 - 30.0;
            let stencil = CellInterpolation::for_incidence(beam, incidence).unwrap();
            if beam < 3 {
                assert!(stencil.lower <= 19, "beam {} incidence {}", beam, incidence);
            } else {
                assert!((21..=40).contains(&stencil.lower), "beam {} incidence {}", beam, incidence);
            }
        }
    }
}

#[test]
fn test_every_table_is_exact_at_breakpoints() {
    for table in tables() {
        for beam in 0..BEAMS {
            let cells = if beam < 3 { 0..=20 } else { 21..=41 };
            for cell in cells {
                assert_eq!(
                    table.interpolate(beam, cell as f64).unwrap(),
                    table.offset(beam, cell).unwrap(),
                    "v{} beam {} cell {}",
                    table.version,
                    beam,
                    cell
                );
            }
        }
    }
}

#[test]
fn test_processor_version_selects_table() {
    assert_eq!(SzfCalibrator::for_processor(Version::new(5, 1)).table().version, 1);
    assert_eq!(SzfCalibrator::for_processor(Version::new(5, 2)).table().version, 2);
    assert_eq!(SzfCalibrator::for_processor(Version::new(5, 3)).table().version, 3);
    assert_eq!(SzfCalibrator::for_processor(Version::new(6, 2)).table().version, 3);
    assert_eq!(SzfCalibrator::for_processor(Version::new(7, 4)).table().version, 4);
    assert_eq!(select_table(u32::MAX).version, 4);
}

#[test]
fn test_node_apply_then_remove() {
    let calibrator = SzfCalibrator::for_processor(Version::new(5, 2));
    for beam in 0..BEAMS {
        let mut measured = node(beam, 37.3, -9.75);
        calibrator
            .calibrate_node(&mut measured, CalibrationDirection::Apply)
            .unwrap();
        let offset = calibrator.table().offset_for_incidence(beam, 37.3).unwrap();
        assert_relative_eq!(measured.sigma0, -9.75 + offset, epsilon = 1e-12);

        calibrator
            .calibrate_node(&mut measured, CalibrationDirection::Remove)
            .unwrap();
        assert_relative_eq!(measured.sigma0, -9.75, epsilon = 1e-12);
    }

    let mut invalid = node(6, 40.0, -10.0);
    assert!(calibrator
        .calibrate_node(&mut invalid, CalibrationDirection::Apply)
        .is_err());
    assert_eq!(invalid.sigma0, -10.0);
}
