use crate::cli::StatusArgs;
use crate::config::PartialRunConfig;
use crate::error::Result;
use mdchain::core::marker::ProgressMarker;
use mdchain::engine::error::EngineError;

pub fn run(args: StatusArgs) -> Result<()> {
    let naming =
        PartialRunConfig::from_optional_file(args.config.as_deref())?.status_naming(&args);
    let marker_path = naming.marker_path();

    let Some(marker) = ProgressMarker::load(&marker_path).map_err(EngineError::from)? else {
        println!("No progress recorded at {}", marker_path.display());
        return Ok(());
    };

    let completed = marker.next_iteration();
    println!("Marker:          {}", marker_path.display());
    println!(
        "Completed:       {} of {} segment(s)",
        completed, marker.total_steps
    );
    println!(
        "Latest state:    {}{}",
        marker.state_artifact.display(),
        if marker.state_artifact.is_file() {
            ""
        } else {
            " (missing!)"
        }
    );
    if completed >= marker.total_steps {
        println!("Status:          finished");
    } else {
        println!("Status:          resumable at iteration {}", completed);
    }
    Ok(())
}
