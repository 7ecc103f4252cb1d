use std::str::FromStr;

pub const USAGE: &str = "\
commands:
  process-runs                              recover interrupted runs, then poll for ready runs
  rerun run <id>                            put one model run back in the queue
  rerun area <model_area_name>              requeue every run of a model area
  rerun all                                 requeue every model run
  calibration replace <old_id> <new_id>     move runs to a new calibration set and requeue them
  classify <model_area_id>                  recompute irrigation/rainfall support flags
  features apply <model_area_id> [package]  rewrite an area's flags from its feature package
  stats                                     run counts by state
  help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerunTarget {
    Run(i32),
    Area(String),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    ProcessRuns,
    Rerun(RerunTarget),
    CalibrationReplace { old_set_id: i32, new_set_id: i32 },
    Classify { model_area_id: i32 },
    FeaturesApply {
        model_area_id: i32,
        package: Option<String>,
    },
    Stats,
    Help,
    Unknown(String),
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }
        let id_at = |i: usize| parts.get(i).and_then(|s| s.parse::<i32>().ok());

        match parts[0] {
            "process-runs" | "process_runs" => Ok(AppCommand::ProcessRuns),
            "rerun" => match (parts.get(1).copied(), parts.len()) {
                (Some("run"), 3) => match id_at(2) {
                    Some(id) => Ok(AppCommand::Rerun(RerunTarget::Run(id))),
                    None => Ok(AppCommand::Unknown(format!("not a model run id: {}", parts[2]))),
                },
                // area names may contain spaces
                (Some("area"), n) if n >= 3 => Ok(AppCommand::Rerun(RerunTarget::Area(
                    parts[2..].join(" "),
                ))),
                (Some("all"), 2) => Ok(AppCommand::Rerun(RerunTarget::All)),
                _ => Ok(AppCommand::Unknown(
                    "usage: rerun run <id> | rerun area <name> | rerun all".to_string(),
                )),
            },
            "calibration" => match (parts.get(1).copied(), id_at(2), id_at(3)) {
                (Some("replace"), Some(old_set_id), Some(new_set_id)) => {
                    Ok(AppCommand::CalibrationReplace {
                        old_set_id,
                        new_set_id,
                    })
                }
                _ => Ok(AppCommand::Unknown(
                    "usage: calibration replace <old_set_id> <new_set_id>".to_string(),
                )),
            },
            "classify" => match id_at(1) {
                Some(model_area_id) => Ok(AppCommand::Classify { model_area_id }),
                None => Ok(AppCommand::Unknown("usage: classify <model_area_id>".to_string())),
            },
            "features" => match (parts.get(1).copied(), id_at(2)) {
                (Some("apply"), Some(model_area_id)) => Ok(AppCommand::FeaturesApply {
                    model_area_id,
                    package: parts.get(3).map(|s| s.to_string()),
                }),
                _ => Ok(AppCommand::Unknown(
                    "usage: features apply <model_area_id> [package]".to_string(),
                )),
            },
            "stats" => Ok(AppCommand::Stats),
            "help" | "h" | "--help" => Ok(AppCommand::Help),
            _ => Ok(AppCommand::Unknown(format!("unknown command: {}", parts[0]))),
        }
    }
}
