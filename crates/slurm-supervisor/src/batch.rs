//! Batch-script generation and exclusion-list persistence.
//!
//! Grounded in
//! `examples/original_source/script/python/tools/auto_submitter/batch.py`'s
//! `BatchFile`/`GromacsBatchFile`, with the two redesign flags from
//! `SPEC_FULL.md` §4.5/§9 applied: `grompp`'s flags are joined with
//! proper whitespace (the source omits the space before `-p topol.top`)
//! and every builder concatenates its tokens directly onto an owned
//! `String` rather than routing through a "prefix + discarded extend"
//! pattern.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::{SupervisorError, SupervisorResult};
use crate::job::JobRecord;

/// Generate the `-gpu_id` flag value: for each GPU index `i` in
/// `0..num_gpus`, the character `i` repeated `num_procs / num_gpus`
/// times.
pub fn gpu_flag(num_gpus: u32, num_procs: u32) -> String {
    if num_gpus == 0 {
        return String::new();
    }
    let per_gpu = num_procs / num_gpus;
    (0..num_gpus)
        .map(|i| i.to_string().repeat(per_gpu as usize))
        .collect()
}

fn curr_section_name(job: &JobRecord) -> String {
    format!(
        "{}_{}",
        job.name_base.as_deref().unwrap_or_default(),
        job.section_num
    )
}

fn next_section_name(job: &JobRecord) -> String {
    format!(
        "{}_{}",
        job.name_base.as_deref().unwrap_or_default(),
        job.section_num + 1
    )
}

/// Generate the base SLURM header shared by every job type, per
/// `SPEC_FULL.md` §4.5.
pub fn generate_header(job: &JobRecord) -> SupervisorResult<String> {
    let mut header = String::from("#!/bin/bash -l\n#SBATCH\n");
    header.push_str(&format!("#SBATCH --job-name={}\n", job.name));
    header.push_str(&format!("#SBATCH --time={}\n", job.time_limit));
    header.push_str(&format!("#SBATCH -N {}\n", job.num_nodes));
    header.push_str(&format!("#SBATCH --ntasks-per-node={}\n", job.num_procs));
    header.push_str(&format!("#SBATCH --cpus-per-task={}\n", job.num_threads));
    header.push_str("#SBATCH --exclusive\n");
    header.push_str(&format!("#SBATCH --partition={}\n", job.partition));

    if job.partition == "gpu" {
        job.validate_gpu().map_err(|reason| SupervisorError::Validation {
            job: job.name.clone(),
            reason,
        })?;
        header.push_str(&format!(
            "#SBATCH --gres=gpu:{}\n",
            job.num_gpus.expect("validated above")
        ));
    }

    let exclusion = if !job.exclusion_list.is_empty() {
        job.exclusion_list.clone()
    } else if job.exclusion_path.is_some() {
        load_exclusion_list(&job.exclusion_path())?
    } else {
        BTreeSet::new()
    };
    if !exclusion.is_empty() {
        let joined = exclusion.into_iter().collect::<Vec<_>>().join(",");
        header.push_str(&format!("#SBATCH --exclude={joined}\n"));
    }

    header.push_str("#\n\n");
    Ok(header)
}

/// Generate the Gromacs environment-setup section, per
/// `SPEC_FULL.md` §4.5.
pub fn generate_environment_gromacs(job: &JobRecord) -> String {
    let binary_path = job.binary_path.as_deref().unwrap_or_default();
    format!(
        "module load gcc\nmodule load intel-mpi\nmodule load cuda/7.5\n\n\
         source {binary_path}/GMXRC\n\
         export OMP_NUM_THREADS={}\n\
         cd {}\n",
        job.num_threads, job.work_dir
    )
}

fn grompp_command(job: &JobRecord) -> String {
    let mdp = job.mdp.as_deref().unwrap_or_default();
    let mut cmd = format!(
        "mdrun -np 1 gmx_mpi grompp -f {mdp} -o {}.tpr -c {}.gro -p topol.top",
        next_section_name(job),
        curr_section_name(job)
    );
    if let Some(index) = &job.index {
        cmd.push_str(&format!(" -n {index}.ndx"));
    }
    if job.continuation {
        cmd.push_str(&format!(" -t {}.cpt", curr_section_name(job)));
    }
    cmd.push('\n');
    cmd
}

fn mdrun_command(job: &JobRecord, makeup: bool) -> String {
    let mut cmd = format!(
        "mpirun -np {} gmx_mpi mdrun -ntomp {} -pin on -v",
        job.num_procs, job.num_threads
    );
    if makeup {
        cmd.push_str(&format!(
            " -deffnm {} -cpi {}.cpt -append",
            curr_section_name(job),
            curr_section_name(job)
        ));
    } else {
        cmd.push_str(&format!(" -deffnm {}", next_section_name(job)));
    }
    if job.partition == "gpu" {
        let num_gpus = job.num_gpus.unwrap_or(0);
        cmd.push_str(&format!(
            " -dlb no -gpu_id {}",
            gpu_flag(num_gpus, job.num_procs)
        ));
    }
    cmd.push('\n');
    cmd
}

/// Generate the Gromacs binary section. In makeup mode, grompp is
/// skipped entirely and `mdrun` resumes the current section from its
/// checkpoint; otherwise grompp prepares the next section before
/// `mdrun` runs it, per `SPEC_FULL.md` §4.5/§4.6.
pub fn generate_binary_gromacs(job: &JobRecord, makeup: bool) -> String {
    if makeup {
        mdrun_command(job, true)
    } else {
        format!("{}{}", grompp_command(job), mdrun_command(job, false))
    }
}

/// Render a complete Gromacs batch script for `job`.
pub fn generate_gromacs_batch(job: &JobRecord, makeup: bool) -> SupervisorResult<String> {
    let mut script = generate_header(job)?;
    script.push_str(&generate_environment_gromacs(job));
    script.push_str(&generate_binary_gromacs(job, makeup));
    Ok(script)
}

/// Read a sorted, deduplicated node-id list from `path`, one id per
/// line. Missing files are treated as an empty list.
pub fn load_exclusion_list(path: &Path) -> SupervisorResult<BTreeSet<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(err) => Err(err.into()),
    }
}

/// Write `job`'s exclusion list to its exclusion file: one node-id per
/// line, sorted and deduplicated (guaranteed by `BTreeSet`). Idempotent.
pub fn persist_exclusion_list(job: &JobRecord) -> SupervisorResult<()> {
    let path = job.exclusion_path();
    let mut contents = String::new();
    for node in &job.exclusion_list {
        contents.push_str(node);
        contents.push('\n');
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Add `node_id` to `job`'s exclusion list and persist it, lazily
/// defaulting the exclusion path to `<name>_exclusion` if unset.
/// Idempotent: adding the same node twice writes the same content.
pub fn add_exclusion_node(job: &mut JobRecord, node_id: &str) -> SupervisorResult<()> {
    if job.exclusion_path.is_none() {
        job.exclusion_path = Some(job.exclusion_path());
    }
    job.exclusion_list.insert(node_id.to_string());
    persist_exclusion_list(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn sample_job() -> JobRecord {
        JobRecord {
            name: "md1".to_string(),
            job_type: "Gromacs".to_string(),
            remote: "cluster".to_string(),
            batch_type: "slurm".to_string(),
            username: "alice".to_string(),
            work_dir: "/work/md1".to_string(),
            time_limit: "24:00:00".to_string(),
            num_nodes: 1,
            num_procs: 4,
            num_threads: 2,
            partition: "standard".to_string(),
            num_gpus: None,
            name_base: Some("sim".to_string()),
            section_num: 3,
            mdp: Some("sim.mdp".to_string()),
            continuation: true,
            makeup: false,
            job_id: String::new(),
            exp_completion: crate::job::ExpCompletion::ZERO,
            exclusion_list: BTreeSet::new(),
            exclusion_path: None,
            index: Some("sim".to_string()),
            binary_path: Some("/opt/gromacs".to_string()),
            table_index: None,
        }
    }

    #[test]
    fn gpu_flag_matches_boundary_examples() {
        assert_eq!(gpu_flag(2, 4), "0011");
        assert_eq!(gpu_flag(1, 4), "0000");
    }

    #[test]
    fn header_contains_required_directives() {
        let job = sample_job();
        let header = generate_header(&job).unwrap();
        assert!(header.starts_with("#!/bin/bash -l\n"));
        assert!(header.contains("--job-name=md1"));
        assert!(header.contains("--time=24:00:00"));
        assert!(header.contains("-N 1"));
        assert!(header.contains("--ntasks-per-node=4"));
        assert!(header.contains("--cpus-per-task=2"));
        assert!(header.contains("--exclusive"));
        assert!(header.contains("--partition=standard"));
    }

    #[test]
    fn header_rejects_inconsistent_gpu_counts() {
        let mut job = sample_job();
        job.partition = "gpu".to_string();
        job.num_gpus = Some(3);
        job.num_procs = 4;
        assert!(generate_header(&job).is_err());
    }

    #[test]
    fn header_adds_gres_for_gpu_partition() {
        let mut job = sample_job();
        job.partition = "gpu".to_string();
        job.num_gpus = Some(2);
        job.num_procs = 4;
        let header = generate_header(&job).unwrap();
        assert!(header.contains("--gres=gpu:2"));
    }

    #[test]
    fn grompp_has_whitespace_before_topol() {
        let job = sample_job();
        let binary = generate_binary_gromacs(&job, false);
        assert!(binary.contains(".gro -p topol.top"));
        assert!(!binary.contains(".grop topol.top"));
    }

    #[test]
    fn normal_mode_includes_grompp_and_next_section() {
        let job = sample_job();
        let binary = generate_binary_gromacs(&job, false);
        assert!(binary.contains("grompp"));
        assert!(binary.contains("-o sim_4.tpr"));
        assert!(binary.contains("-c sim_3.gro"));
        assert!(binary.contains("-n sim.ndx"));
        assert!(binary.contains("-t sim_3.cpt"));
        assert!(binary.contains("-deffnm sim_4"));
    }

    #[test]
    fn makeup_mode_skips_grompp_and_resumes_current_section() {
        let job = sample_job();
        let binary = generate_binary_gromacs(&job, true);
        assert!(!binary.contains("grompp"));
        assert!(binary.contains("-deffnm sim_3 -cpi sim_3.cpt -append"));
    }

    #[test]
    fn gpu_partition_mdrun_adds_dlb_and_gpu_id() {
        let mut job = sample_job();
        job.partition = "gpu".to_string();
        job.num_gpus = Some(2);
        job.num_procs = 4;
        let binary = generate_binary_gromacs(&job, false);
        assert!(binary.contains("-dlb no -gpu_id 0011"));
    }

    #[test]
    fn exclusion_list_round_trips_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut job = sample_job();
        job.exclusion_path = Some(dir.path().join("md1_exclusion"));

        add_exclusion_node(&mut job, "compute0530").unwrap();
        let first_write = fs::read_to_string(job.exclusion_path()).unwrap();

        add_exclusion_node(&mut job, "compute0530").unwrap();
        let second_write = fs::read_to_string(job.exclusion_path()).unwrap();

        assert_eq!(first_write, second_write);
        assert_eq!(first_write, "compute0530\n");
    }

    #[test]
    fn exclusion_list_is_sorted() {
        let dir = tempdir().unwrap();
        let mut job = sample_job();
        job.exclusion_path = Some(dir.path().join("md1_exclusion"));

        add_exclusion_node(&mut job, "compute0900").unwrap();
        add_exclusion_node(&mut job, "compute0100").unwrap();

        let contents = fs::read_to_string(job.exclusion_path()).unwrap();
        assert_eq!(contents, "compute0100\ncompute0900\n");
    }

    #[test]
    fn header_lazily_loads_unpopulated_exclusion_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("md1_exclusion");
        fs::write(&path, "compute0530\n").unwrap();

        let mut job = sample_job();
        job.exclusion_path = Some(path);
        assert!(job.exclusion_list.is_empty());

        let header = generate_header(&job).unwrap();
        assert!(header.contains("--exclude=compute0530"));
    }
}
