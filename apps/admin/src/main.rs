use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    drain_events, load_settings, AdminEvent, AlleleSlot, EventBus, FileStatus, HttpDnaApi,
    NoticeLevel, TableRow, TableStore, TableView, UploadFile, UploadMode, UploadQueue,
};
use shared::{
    domain::{FileId, LocusName, PersonId, Role, RoleFilter},
    matching::{compare_exact, profile_of, rank_candidates},
    protocol::PersonData,
};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dna-admin", about = "Administer DNA profile records")]
struct Cli {
    /// Settings file; defaults to ./dna-admin.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    page_size: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// father, mother, child or parent.
        #[arg(long)]
        role: Option<RoleFilter>,
        /// Backend search: records that contain this person.
        #[arg(long)]
        search: Option<i64>,
        /// Local filter: these persons and the people shown against them.
        #[arg(long = "person", value_delimiter = ',')]
        persons: Vec<i64>,
    },
    Show {
        person_id: i64,
        #[arg(long)]
        json: bool,
    },
    Edit {
        person_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        /// LOCUS=A/B for an existing locus.
        #[arg(long = "set")]
        set: Vec<String>,
        /// LOCUS=A/B for a new locus.
        #[arg(long = "add")]
        add: Vec<String>,
        #[arg(long = "remove")]
        remove: Vec<String>,
    },
    Delete {
        #[arg(required = true, value_delimiter = ',')]
        person_ids: Vec<i64>,
    },
    DeleteFile {
        file_id: i64,
    },
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Match {
        file: PathBuf,
        /// Role of the person in the report.
        #[arg(long)]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(page_size) = cli.page_size.filter(|size| *size > 0) {
        settings.page_size = page_size;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let api = Arc::new(HttpDnaApi::new(&settings.api_base_url)?);
    info!(base_url = %api.base_url(), "using backend");
    let events = EventBus::default();
    let mut rx = events.subscribe();
    let store = TableStore::new(api.clone(), events.clone(), settings.page_size);

    let result = match cli.command {
        Command::List {
            page,
            role,
            search,
            persons,
        } => list(&store, page, role, search, persons).await,
        Command::Show { person_id, json } => show(&store, PersonId(person_id), json).await,
        Command::Edit {
            person_id,
            name,
            role,
            set,
            add,
            remove,
        } => {
            let edits = Edits {
                name,
                role,
                set,
                add,
                remove,
            };
            edit(&store, PersonId(person_id), edits).await
        }
        Command::Delete { person_ids } => {
            let ids: Vec<PersonId> = person_ids.into_iter().map(PersonId).collect();
            delete(&store, &ids).await
        }
        Command::DeleteFile { file_id } => delete_file(&store, FileId(file_id)).await,
        Command::Upload { files } => {
            let queue = UploadQueue::new(
                api,
                events.clone(),
                settings.upload_policy(),
                UploadMode::Save,
            )
            .with_polling(settings.poll_interval(), settings.poll_timeout());
            upload(&queue, &files).await
        }
        Command::Match { file, role } => {
            let queue = UploadQueue::new(
                api,
                events.clone(),
                settings.upload_policy(),
                UploadMode::Match { role },
            )
            .with_polling(settings.poll_interval(), settings.poll_timeout());
            match_report(&store, &queue, &file).await
        }
    };

    print_notices(&mut rx);
    result
}

async fn list(
    store: &TableStore,
    page: u32,
    role: Option<RoleFilter>,
    search: Option<i64>,
    persons: Vec<i64>,
) -> Result<()> {
    if let Some(person_id) = search {
        store.search_person(PersonId(person_id)).await?;
    }
    if !persons.is_empty() {
        store
            .filter_by_multiple_persons(persons.into_iter().map(PersonId))
            .await?;
    }
    store.set_role_filter(role).await?;
    let view = store.go_to_page(page.saturating_sub(1)).await?;
    print_view(&view);
    Ok(())
}

async fn load_person(store: &TableStore, person_id: PersonId) -> Result<TableRow> {
    let view = store.search_person(person_id).await?;
    view.rows
        .into_iter()
        .find(|row| row.person.id == person_id)
        .with_context(|| format!("person {person_id} not found"))
}

async fn show(store: &TableStore, person_id: PersonId, json: bool) -> Result<()> {
    let row = load_person(store, person_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&row.person)?);
        return Ok(());
    }

    let person = &row.person;
    println!("{} {} ({})", person.id, person.name, person.role);
    for locus in &person.loci {
        println!(
            "  {:<10} {:>5} {:>5}",
            locus.locus_name,
            locus.allele_1.as_deref().unwrap_or("-"),
            locus.allele_2.as_deref().unwrap_or("-")
        );
    }
    for file in person.files() {
        println!("  file {} {} {}", file.id, file.file, file.uploaded_at);
    }

    let profile = profile_of(&person.loci);
    let rows = store.view().await.rows;
    let related: Vec<&PersonData> = row
        .related
        .iter()
        .filter_map(|other| rows.iter().find(|r| r.person.id == other.id))
        .map(|r| &r.person)
        .collect();
    for ranked in rank_candidates(&profile, related.iter().copied(), related.len()) {
        let Some(other) = related.iter().find(|p| p.id == ranked.person_id) else {
            continue;
        };
        let exact = compare_exact(&profile, &profile_of(&other.loci));
        let identical = exact.total > 0 && exact.matching == exact.total;
        println!(
            "  related {} {} ({}): {}/{} loci, {:.2}%{}",
            ranked.person_id.0,
            ranked.name,
            other.role.as_str(),
            ranked.comparison.matching,
            ranked.comparison.total,
            ranked.comparison.percentage(),
            if identical { " [identical profile]" } else { "" }
        );
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Edits {
    name: Option<String>,
    role: Option<Role>,
    set: Vec<String>,
    add: Vec<String>,
    remove: Vec<String>,
}

async fn edit(store: &TableStore, person_id: PersonId, edits: Edits) -> Result<()> {
    load_person(store, person_id).await?;

    let set = edits
        .set
        .iter()
        .map(|raw| parse_locus_edit(raw))
        .collect::<Result<Vec<_>>>()?;
    let add = edits
        .add
        .iter()
        .map(|raw| {
            let (name, allele_1, allele_2) = parse_locus_edit(raw)?;
            let name: LocusName = name.parse()?;
            Ok((name, allele_1, allele_2))
        })
        .collect::<Result<Vec<_>>>()?;

    store.toggle_row(person_id).await?;
    store
        .edit(person_id, |form| {
            if let Some(name) = edits.name {
                form.set_name(name);
            }
            if let Some(role) = edits.role {
                form.set_role(role);
            }
            for locus in &edits.remove {
                form.remove_locus(locus)?;
            }
            for (locus, allele_1, allele_2) in set {
                form.set_allele(&locus, AlleleSlot::First, allele_1)?;
                form.set_allele(&locus, AlleleSlot::Second, allele_2)?;
            }
            for (name, allele_1, allele_2) in add {
                form.add_locus(name, allele_1, allele_2)?;
            }
            Ok(())
        })
        .await?;

    if !store.has_changes(person_id).await {
        println!("nothing to change for person {person_id}");
        return Ok(());
    }
    store.save_row(person_id).await?;
    println!("saved person {person_id}");
    Ok(())
}

fn parse_locus_edit(raw: &str) -> Result<(String, String, String)> {
    let Some((name, alleles)) = raw.split_once('=') else {
        bail!("expected LOCUS=A/B, got {raw:?}");
    };
    let Some((allele_1, allele_2)) = alleles.split_once('/') else {
        bail!("expected two alleles separated by '/', got {alleles:?}");
    };
    Ok((
        name.trim().to_string(),
        allele_1.trim().to_string(),
        allele_2.trim().to_string(),
    ))
}

async fn delete(store: &TableStore, person_ids: &[PersonId]) -> Result<()> {
    // The parent check needs each person loaded, so each goes through its own search scope.
    for person_id in person_ids {
        load_person(store, *person_id).await?;
        store.delete_persons(&[*person_id]).await?;
        println!("deleted person {person_id}");
    }
    Ok(())
}

async fn delete_file(store: &TableStore, file_id: FileId) -> Result<()> {
    store.sync().await?;
    store.delete_file(file_id).await?;
    println!("deleted file {file_id}");
    Ok(())
}

async fn read_report(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadFile::new(filename, mime_for(path), bytes))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

async fn upload(queue: &UploadQueue, paths: &[PathBuf]) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_report(path).await?);
    }
    queue.enqueue(files).await?;
    let outcome = queue.run().await?;
    print_files(queue).await;
    println!(
        "{} succeeded, {} failed{}",
        outcome.succeeded,
        outcome.failed,
        if outcome.reload_requested {
            ", records changed"
        } else {
            ""
        }
    );
    Ok(())
}

async fn match_report(store: &TableStore, queue: &UploadQueue, path: &Path) -> Result<()> {
    queue.enqueue(vec![read_report(path).await?]).await?;
    let outcome = queue.run().await?;
    print_files(queue).await;
    if outcome.matches.is_empty() {
        println!("no matches");
        return Ok(());
    }
    for found in &outcome.matches {
        println!(
            "{} {} ({}): {:.2}% ({}/{} loci)",
            found.person_id,
            found.name,
            found.role,
            found.match_percentage,
            found.matching_loci,
            found.total_loci
        );
    }
    let view = store
        .filter_by_multiple_persons(outcome.matched_person_ids())
        .await?;
    print_view(&view);
    Ok(())
}

async fn print_files(queue: &UploadQueue) {
    for queued in queue.files().await {
        match &queued.status {
            FileStatus::Error(message) => println!("{}: error: {message}", queued.filename()),
            status => println!("{}: {status:?}", queued.filename()),
        }
    }
}

fn print_view(view: &TableView) {
    for row in &view.rows {
        let related = row
            .related
            .iter()
            .map(|person| format!("{} {}", person.id, person.name))
            .collect::<Vec<_>>()
            .join(", ");
        let uploaded = row
            .uploaded_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:>6} {:<24} {:<7} {:>3} loci  {:<16}  [{}]",
            row.person.id.0,
            row.person.name,
            row.person.role.as_str(),
            row.person.loci_count,
            uploaded,
            related
        );
    }
    println!(
        "page {}/{} ({} records{})",
        view.page_index + 1,
        view.page_count,
        view.total_records,
        if view.more_available { ", more available" } else { "" }
    );
}

fn print_notices(rx: &mut broadcast::Receiver<AdminEvent>) {
    for event in drain_events(rx) {
        if let AdminEvent::Notice { level, message } = event {
            match level {
                NoticeLevel::Error => eprintln!("error: {message}"),
                NoticeLevel::Success | NoticeLevel::Info => println!("{message}"),
            }
        }
    }
}
