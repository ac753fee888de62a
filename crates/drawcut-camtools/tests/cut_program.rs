use drawcut_camtools::{CutProgramConfig, CutProgramGenerator};
use drawcut_core::MachiningParameters;
use drawcut_designer::{Contour, DrawPath, Outline, Outliner, OutlinerConfig, Point};

fn params() -> MachiningParameters {
    MachiningParameters {
        target_depth: 6.0,
        depth_of_cut: 2.0,
        ..MachiningParameters::default()
    }
}

fn rectangle_outline() -> Outline {
    let path = DrawPath::from_points(&[
        Point::new(20.0, 20.0),
        Point::new(80.0, 20.0),
        Point::new(80.0, 60.0),
        Point::new(20.0, 60.0),
    ]);
    Outliner::new(OutlinerConfig::from_params(&params(), 0.05))
        .unwrap()
        .generate_outline(&path)
        .unwrap()
}

fn plunge_count(lines: &[String]) -> usize {
    lines.iter().filter(|l| l.starts_with("G1 Z")).count()
}

/// Number of times the program arrives back at `start` with a cutting move.
fn closed_traces(lines: &[String], start: &Point) -> usize {
    let closing = format!("G1 X{:.3} Y{:.3} ", start.x, start.y);
    lines.iter().filter(|l| l.starts_with(&closing)).count()
}

#[test]
fn three_passes_reach_target_depth() {
    let outline = rectangle_outline();
    let program = CutProgramGenerator::new(CutProgramConfig::default())
        .generate(&outline, None, None, &params())
        .unwrap();
    let lines = program.lines();

    // One plunge per contour per pass.
    assert_eq!(plunge_count(&lines), 3 * outline.len());
    let depths: Vec<&String> = lines.iter().filter(|l| l.starts_with("G1 Z")).collect();
    assert_eq!(depths[0], "G1 Z-2.000 F150.0");
    assert_eq!(depths[depths.len() - 1], "G1 Z-6.000 F150.0");

    let outer = outline.contours()[0].start().unwrap();
    assert_eq!(closed_traces(&lines, &outer), 3);
}

#[test]
fn hole_adds_traces_without_changing_passes() {
    let outline = rectangle_outline();
    let hole = Contour::new(vec![
        Point::new(45.0, 35.0),
        Point::new(55.0, 35.0),
        Point::new(55.0, 45.0),
        Point::new(45.0, 45.0),
    ]);
    let generator = CutProgramGenerator::new(CutProgramConfig::default());

    let plain = generator.generate(&outline, None, None, &params()).unwrap().lines();
    let holed = generator
        .generate(&outline, Some(&hole), None, &params())
        .unwrap()
        .lines();

    let outer = outline.contours()[0].start().unwrap();
    assert_eq!(closed_traces(&plain, &outer), 3);
    assert_eq!(closed_traces(&holed, &outer), 3);
    assert_eq!(closed_traces(&holed, &Point::new(45.0, 35.0)), 3);
    assert_eq!(plunge_count(&holed), plunge_count(&plain) + 3);

    // The hole is cut before the outline in every pass.
    let first_hole = holed.iter().position(|l| l == "G0 X45.000 Y35.000").unwrap();
    let first_outer = holed
        .iter()
        .position(|l| *l == format!("G0 X{:.3} Y{:.3}", outer.x, outer.y))
        .unwrap();
    assert!(first_hole < first_outer);
}

#[test]
fn program_file_matches_streamed_lines() {
    let program = CutProgramGenerator::new(CutProgramConfig::default())
        .generate(&rectangle_outline(), None, None, &params())
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.nc");
    program.write_to_file(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let written: Vec<&str> = written.lines().collect();
    assert_eq!(written, program.lines());
}
