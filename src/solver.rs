// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Client for running astrometry.net's solve-field inside a Docker
//! container and parsing its WCS output.
//!
//! Two execution modes are supported: `docker run` spawns a fresh container
//! per solve (simple, slower), and `docker exec` reuses a long-running
//! container (faster for repeated solves). The solve itself is a black box;
//! this module prepares inputs, enforces the timeout, and hands the
//! resulting .wcs file to [`crate::wcs`].

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{ChildStderr, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use canonical_error::{
    deadline_exceeded_error, failed_precondition_error, internal_error, invalid_argument_error,
    CanonicalError,
};
use log::{info, warn};

use crate::config::{ClientConfig, SolveOptions, DEFAULT_DOCKER_IMAGE, DEFAULT_TIMEOUT};
use crate::wcs::{parse_wcs_file, PlateSolution};

/// Output files solve-field writes alongside its input image.
const OUTPUT_SUFFIXES: [&str; 7] = [
    ".wcs",
    ".corr",
    ".solved",
    ".match",
    ".rdls",
    ".axy",
    "-indx.xyls",
];

/// Interval between child exit checks while waiting for a solve.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Client for plate-solving via a containerized solve-field.
#[derive(Debug)]
pub struct SolverClient {
    config: ClientConfig,
}

impl SolverClient {
    /// Creates a client, validating the configuration and filling in
    /// defaults for unset fields. `index_path` is required and must exist.
    pub fn new(mut config: ClientConfig) -> Result<Self, CanonicalError> {
        if config.index_path.as_os_str().is_empty() {
            return Err(invalid_argument_error("index_path is required"));
        }
        if !config.index_path.exists() {
            return Err(invalid_argument_error(
                format!(
                    "index_path does not exist: {}",
                    config.index_path.display()
                )
                .as_str(),
            ));
        }
        if config.docker_image.is_empty() {
            config.docker_image = DEFAULT_DOCKER_IMAGE.to_string();
        }
        if config.timeout.is_zero() {
            config.timeout = DEFAULT_TIMEOUT;
        }
        if config.temp_dir.as_os_str().is_empty() {
            config.temp_dir = std::env::temp_dir();
        }
        Ok(SolverClient { config })
    }

    /// Plate-solves the given image file.
    ///
    /// Returns `solved: false` (not an error) when the solver ran but found
    /// no solution. Errors: InvalidArgument for a missing image,
    /// DeadlineExceeded when the configured timeout elapses, Internal when
    /// the Docker command fails.
    pub fn solve(
        &self,
        image_path: &Path,
        opts: &SolveOptions,
    ) -> Result<PlateSolution, CanonicalError> {
        if !image_path.exists() {
            return Err(invalid_argument_error(
                format!("Image file does not exist: {}", image_path.display()).as_str(),
            ));
        }
        let abs_image = std::fs::canonicalize(image_path).map_err(|e| {
            failed_precondition_error(
                format!("Failed to resolve image path: {}", e).as_str(),
            )
        })?;
        let abs_index = std::fs::canonicalize(&self.config.index_path).map_err(|e| {
            failed_precondition_error(
                format!("Failed to resolve index path: {}", e).as_str(),
            )
        })?;
        let image_filename = abs_image
            .file_name()
            .ok_or_else(|| invalid_argument_error("Image path has no file name"))?
            .to_string_lossy()
            .into_owned();

        // solve-field writes its outputs alongside the input, so work in a
        // scratch directory containing a copy of the image.
        let scratch = tempfile::Builder::new()
            .prefix("astrometry-")
            .tempdir_in(&self.config.temp_dir)
            .map_err(|e| {
                failed_precondition_error(
                    format!("Failed to create scratch directory: {}", e).as_str(),
                )
            })?;
        let scratch_dir: PathBuf;
        let _scratch_guard: Option<tempfile::TempDir>;
        if opts.keep_temp_files {
            scratch_dir = scratch.keep();
            info!(
                "keep_temp_files enabled: scratch directory preserved at {}",
                scratch_dir.display()
            );
            _scratch_guard = None;
        } else {
            scratch_dir = scratch.path().to_path_buf();
            _scratch_guard = Some(scratch);
        }
        std::fs::copy(&abs_image, scratch_dir.join(&image_filename)).map_err(|e| {
            failed_precondition_error(
                format!("Failed to copy image to scratch directory: {}", e).as_str(),
            )
        })?;

        let solve_args = self.build_solve_args(&image_filename, &scratch_dir, opts);
        let docker_args = self.build_docker_args(&scratch_dir, &abs_index, solve_args);

        let start = Instant::now();
        let output = self.run_with_deadline(&docker_args, start + self.config.timeout)?;
        let solve_time = start.elapsed();

        if !output.success {
            // solve-field reports an unsolvable field through its output
            // rather than a distinct exit code.
            if output.text.contains("Did not solve") || output.text.contains("Failed to solve") {
                return Ok(PlateSolution::default());
            }
            return Err(internal_error(
                format!("Docker command failed: {}", output.text).as_str(),
            ));
        }

        let base_name = Path::new(&image_filename)
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        let wcs_path = scratch_dir.join(format!("{}.wcs", base_name));
        if !wcs_path.exists() {
            // No WCS output means the image was not solved.
            return Ok(PlateSolution::default());
        }

        let mut solution = parse_wcs_file(&wcs_path)?;
        solution.solve_time = Some(solve_time);
        solution.output_files = collect_output_files(&scratch_dir, &base_name);
        Ok(solution)
    }

    /// Plate-solves image data provided as bytes. The data is written to a
    /// temporary file with the given extension (e.g. "jpg"), solved, and
    /// cleaned up.
    pub fn solve_bytes(
        &self,
        data: &[u8],
        format: &str,
        opts: &SolveOptions,
    ) -> Result<PlateSolution, CanonicalError> {
        let temp_image = tempfile::Builder::new()
            .prefix("image-")
            .suffix(&format!(".{}", format))
            .tempfile_in(&self.config.temp_dir)
            .map_err(|e| {
                failed_precondition_error(format!("Failed to create temp file: {}", e).as_str())
            })?;
        std::fs::write(temp_image.path(), data).map_err(|e| {
            failed_precondition_error(format!("Failed to write image data: {}", e).as_str())
        })?;
        self.solve(temp_image.path(), opts)
    }

    /// Constructs the solve-field command line.
    fn build_solve_args(
        &self,
        image_filename: &str,
        scratch_dir: &Path,
        opts: &SolveOptions,
    ) -> Vec<String> {
        let mut args = vec!["solve-field".to_string()];

        if opts.scale_low > 0.0 && opts.scale_high > 0.0 {
            args.push("-L".to_string());
            args.push(format!("{:.6}", opts.scale_low));
            args.push("-H".to_string());
            args.push(format!("{:.6}", opts.scale_high));
            args.push("-u".to_string());
            args.push(opts.scale_units.as_arg().to_string());
        }
        if opts.downsample_factor > 0 {
            args.push("--downsample".to_string());
            args.push(opts.downsample_factor.to_string());
        }
        if opts.depth_low > 0 && opts.depth_high > 0 {
            args.push("--depth".to_string());
            args.push(format!("{}-{}", opts.depth_low, opts.depth_high));
        }
        if opts.no_plots {
            args.push("--no-plots".to_string());
        }
        if opts.ra != 0.0 || opts.dec != 0.0 {
            args.push("--ra".to_string());
            args.push(format!("{:.6}", opts.ra));
            args.push("--dec".to_string());
            args.push(format!("{:.6}", opts.dec));
            if opts.radius > 0.0 {
                args.push("--radius".to_string());
                args.push(format!("{:.6}", opts.radius));
            }
        }
        if opts.overwrite_existing {
            args.push("--overwrite".to_string());
        }
        if !opts.verbose {
            args.push("--no-verify".to_string());
        }

        // In run mode paths are relative to the /data mount; in exec mode
        // the scratch directory is on a volume shared with the container.
        let (work_dir, image_path) = if self.config.use_docker_exec {
            (
                scratch_dir.to_string_lossy().into_owned(),
                scratch_dir.join(image_filename).to_string_lossy().into_owned(),
            )
        } else {
            ("/data".to_string(), format!("/data/{}", image_filename))
        };
        args.push("--dir".to_string());
        args.push(work_dir);
        args.push(image_path);

        args
    }

    /// Wraps the solve-field command in the appropriate Docker invocation.
    fn build_docker_args(
        &self,
        scratch_dir: &Path,
        index_path: &Path,
        solve_args: Vec<String>,
    ) -> Vec<String> {
        let mut docker_args = if self.config.use_docker_exec {
            vec!["exec".to_string(), self.config.container_name.clone()]
        } else {
            vec![
                "run".to_string(),
                "--rm".to_string(),
                "-v".to_string(),
                format!("{}:/data", scratch_dir.display()),
                "-v".to_string(),
                format!("{}:/usr/local/astrometry/data", index_path.display()),
                self.config.docker_image.clone(),
            ]
        };
        docker_args.extend(solve_args);
        docker_args
    }

    /// Runs the Docker command, killing it if `deadline` passes. Returns
    /// the combined stdout/stderr text and exit disposition.
    fn run_with_deadline(
        &self,
        docker_args: &[String],
        deadline: Instant,
    ) -> Result<CommandOutput, CanonicalError> {
        let mut child = Command::new("docker")
            .args(docker_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                failed_precondition_error(format!("Command::spawn error: {:?}", e).as_str())
            })?;
        info!("Started solve-field container");

        let output = Arc::new(Mutex::new(String::new()));
        let stdout_worker = make_stdout_worker(child.stdout.take().unwrap(), output.clone());
        let stderr_worker = make_stderr_worker(child.stderr.take().unwrap(), output.clone());

        let status = loop {
            thread::sleep(WAIT_POLL_INTERVAL);
            match child.try_wait() {
                Err(e) => {
                    return Err(internal_error(
                        format!("Unexpected child.try_wait() error: {:?}", e).as_str(),
                    ));
                }
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(deadline_exceeded_error("Solve operation timed out"));
                    }
                }
            }
        };
        stdout_worker.join().unwrap();
        stderr_worker.join().unwrap();

        let text = output.lock().unwrap().clone();
        Ok(CommandOutput {
            success: status.success(),
            text,
        })
    }
}

struct CommandOutput {
    success: bool,
    text: String,
}

fn make_stdout_worker(stdout: ChildStdout, sink: Arc<Mutex<String>>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            let len = reader
                .read_line(&mut line)
                .expect("reading from pipe should not fail");
            if len == 0 {
                break; // Reached EOF.
            }
            info!("{}", line.trim_end());
            sink.lock().unwrap().push_str(&line);
        }
    })
}

fn make_stderr_worker(stderr: ChildStderr, sink: Arc<Mutex<String>>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stderr);
        loop {
            let mut line = String::new();
            let len = reader
                .read_line(&mut line)
                .expect("reading from pipe should not fail");
            if len == 0 {
                break; // Reached EOF.
            }
            warn!("{}", line.trim_end());
            sink.lock().unwrap().push_str(&line);
        }
    })
}

/// Finds the solve-field output files present for `base_name`.
fn collect_output_files(scratch_dir: &Path, base_name: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for suffix in OUTPUT_SUFFIXES {
        let path = scratch_dir.join(format!("{}{}", base_name, suffix));
        if path.exists() {
            files.push(path);
        }
    }
    files
}
