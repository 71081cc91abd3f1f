use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use photo_board::{cli, config, error, logging, manifest, persist, render, scanner, schema, store, upload};
use photo_board_common::values::initial_values;
use photo_board_common::{FormDefinition, FormValues, Rotation, StyleConfig};
use cli::{Cli, Commands, UploadMode};
use config::Config;
use error::{BoardError, Result};
use schema::{FileFormProvider, FormSchemaProvider, HttpFormProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::{ItemStore, QueueMode, MAX_ITEMS};
use upload::api::HttpRemoteApi;
use upload::history::ThumbnailHistory;
use upload::progress::Progress;
use upload::UploadOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Compose { image, values, rotate, output, preview } => {
            println!("🖼  photo-board - 합성\n");

            let form = resolve_form(&config, cli.form_file.as_deref(), cli.form.as_deref()).await?;
            let picked = scanner::pick_file(&image)?;
            let rotation = rotate.map(Rotation::from_degrees).unwrap_or(picked.rotation);
            let snapshot = base_values(&form, &values);

            let style = Arc::new(StyleConfig::from_form(&form));
            let renderer = Arc::new(render::BoardRenderer::new(&style.font_family));
            if !renderer.has_font() {
                println!("⚠ 글꼴을 찾지 못해 글자 없이 표만 그립니다");
            }
            let request = render::RenderRequest {
                source: Arc::new(render::load_source(&picked.path).await?),
                rotation,
                fields: Arc::new(form.fields.clone()),
                values: snapshot,
                style: Arc::clone(&style),
            };

            if let Some(preview_path) = preview {
                let dims = style.capture.scaled_to_width(config.preview_width);
                let surface = render::PreviewSurface::new(Arc::clone(&renderer), dims);
                let (layout, raster) = surface.render(&request);
                let bytes = render::encode_jpeg(&raster, 90)?;
                std::fs::write(&preview_path, bytes)?;
                println!("✔ 미리보기 {} (글자 {}px): {}", surface.dims(), layout.font_size, preview_path.display());
            }

            let mut surface = render::CaptureSurface::new(renderer, style.capture);
            let ack = surface.present(request).await?;
            let bytes = surface.capture(&ack).await?;
            let output = output.unwrap_or_else(|| default_output(&picked.path));
            std::fs::write(&output, bytes)?;
            println!(
                "✔ 합성 {} (표 {}x{}, 글자 {}px): {}",
                surface.dims(),
                ack.layout.table_width,
                ack.layout.table_height,
                ack.layout.font_size,
                output.display()
            );
        }

        Commands::Upload { images, mode, values, manifest } => {
            println!("📤 photo-board - 업로드\n");

            let token = config.get_token()?;
            let form = resolve_form(&config, cli.form_file.as_deref(), cli.form.as_deref()).await?;

            println!("[1/2] 사진 확인 중...");
            let entries = collect_entries(&form, &images, &values, manifest.as_deref())?;
            println!("✔ {}장\n", entries.len());

            let mut orchestrator = build_orchestrator(&config, &form)?;
            println!("[2/2] 캡처・전송 중...");

            match mode {
                UploadMode::Multi => {
                    let mut store = ItemStore::new(QueueMode::Multi);
                    for entry in entries {
                        store.add(entry.path, entry.rotation, entry.values)?;
                    }
                    let bar = progress_bar();
                    let report = orchestrator
                        .run(&mut store, &form, &token, &mut |p: Progress| show_progress(&bar, p))
                        .await;
                    bar.finish_and_clear();
                    let report = report?;
                    println!("✔ {}장 전송 ({}회 요청)", report.uploaded, report.chunks);
                    print_skipped(&report.skipped);
                }
                UploadMode::Each => {
                    let mut store = ItemStore::new(QueueMode::Single);
                    for (i, entry) in entries.into_iter().enumerate() {
                        store.set_live_values(entry.values);
                        let bar = progress_bar();
                        let report = orchestrator
                            .capture_and_upload(
                                &mut store,
                                entry.path,
                                entry.rotation,
                                &form,
                                &token,
                                &mut |p: Progress| show_progress(&bar, p),
                            )
                            .await;
                        bar.finish_and_clear();
                        let report = report?;
                        println!("✔ {}번째 사진 전송 완료", i + 1);
                        print_skipped(&report.skipped);
                    }
                }
            }

            println!("\n✅ 업로드 완료");
        }

        Commands::Share { images, values, manifest, output_dir } => {
            println!("📎 photo-board - 공유\n");

            let form = resolve_form(&config, cli.form_file.as_deref(), cli.form.as_deref()).await?;
            let entries = collect_entries(&form, &images, &values, manifest.as_deref())?;

            let mut store = ItemStore::new(QueueMode::Multi);
            for entry in entries {
                store.add(entry.path, entry.rotation, entry.values)?;
            }

            let mut orchestrator = build_orchestrator(&config, &form)?;
            let bar = progress_bar();
            let written = orchestrator
                .share(&mut store, &form, &output_dir, &mut |p: Progress| show_progress(&bar, p))
                .await;
            bar.finish_and_clear();
            let written = written?;
            for path in &written {
                println!("  {}", path.display());
            }
            println!("\n✅ {}장 저장: {}", written.len(), output_dir.display());
        }

        Commands::Forms { id } => {
            let provider = form_provider(&config, cli.form_file.as_deref())?;
            match id {
                Some(id) => {
                    let form = provider.form_detail(&id).await?;
                    println!("📋 {} ({})", form.form_name, form.id);
                    for field in &form.fields {
                        if field.options.is_empty() {
                            println!("  - {} [{}]", field.name, field.field_type.as_str());
                        } else {
                            println!("  - {} [{}] {}", field.name, field.field_type.as_str(), field.options.join(" / "));
                        }
                    }
                    let style = StyleConfig::from_form(&form);
                    println!("  캡처 해상도: {}", style.capture);
                }
                None => {
                    let forms = provider.list_forms().await?;
                    println!("📋 폼 {}개", forms.len());
                    for form in forms {
                        println!("  {}  {} (항목 {}개)", form.id, form.form_name, form.fields.len());
                    }
                }
            }
        }

        Commands::History { clear, export_dir } => {
            let mut history = ThumbnailHistory::load(&config.history_path);

            if clear {
                history.clear();
                history.save(&config.history_path)?;
                println!("✔ 기록을 삭제했습니다");
                return Ok(());
            }

            println!("🕘 최근 전송 {}건", history.len());
            for (i, entry) in history.entries().enumerate() {
                let summary: Vec<String> = entry.snapshot.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                println!("  {:>2}. {} {} {}", i + 1, entry.uploaded_at, entry.form_name, summary.join(", "));
            }

            if let Some(dir) = export_dir {
                std::fs::create_dir_all(&dir)?;
                let mut exported = 0;
                for (i, entry) in history.entries().enumerate() {
                    if let Some(bytes) = entry.thumbnail_bytes() {
                        std::fs::write(dir.join(format!("thumb_{:02}.jpg", i + 1)), bytes)?;
                        exported += 1;
                    }
                }
                println!("✔ 썸네일 {}장 저장: {}", exported, dir.display());
            }
        }

        Commands::Config { set_token, set_company, set_team, set_api_url, set_chunk_size, show } => {
            let mut config = config;
            let mut changed = false;

            if let Some(token) = set_token {
                config.token = Some(token);
                changed = true;
            }
            if let Some(company) = set_company {
                config.company_id = Some(company);
                changed = true;
            }
            if let Some(team) = set_team {
                config.team_id = Some(team);
                changed = true;
            }
            if let Some(url) = set_api_url {
                config.api_base_url = url;
                changed = true;
            }
            if let Some(size) = set_chunk_size {
                if size == 0 {
                    return Err(BoardError::Config("chunk_size는 1 이상이어야 합니다".into()));
                }
                config.chunk_size = size;
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 설정을 저장했습니다: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("설정:");
                println!("  서버: {}", config.api_base_url);
                println!("  토큰: {}", if config.get_token().is_ok() { "설정됨" } else { "없음" });
                println!("  회사/팀: {} / {}", config.company_id.as_deref().unwrap_or("-"), config.team_id.as_deref().unwrap_or("-"));
                println!("  원본 저장: {}", config.camera_root.display());
                println!("  합성 저장: {}", config.app_folder.display());
                println!("  묶음 크기: {}장, 제한 시간 {}초", config.chunk_size, config.chunk_timeout_secs);
                println!("  기록 파일: {}", config.history_path.display());
            }
        }
    }

    Ok(())
}

/// 送信対象1件
struct Entry {
    path: PathBuf,
    rotation: Rotation,
    values: FormValues,
}

fn form_provider(config: &Config, form_file: Option<&Path>) -> Result<Box<dyn FormSchemaProvider>> {
    if let Some(path) = form_file {
        return Ok(Box::new(FileFormProvider::new(path)));
    }
    let token = config.get_token()?;
    let (company, team) = config.team_scope()?;
    Ok(Box::new(HttpFormProvider::new(&config.api_base_url, company, team, token)?))
}

async fn resolve_form(config: &Config, form_file: Option<&Path>, form_id: Option<&str>) -> Result<FormDefinition> {
    let provider = form_provider(config, form_file)?;
    let form = match form_id {
        Some(id) => provider.form_detail(id).await?,
        None if form_file.is_some() => provider.form_detail("").await?,
        None => provider
            .list_forms()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BoardError::Config("사용 가능한 폼이 없습니다".into()))?,
    };
    println!("✔ 폼: {} (항목 {}개)", form.form_name, form.fields.len());
    Ok(form)
}

/// 初期値に `--set` の値を重ねる
fn base_values(form: &FormDefinition, overrides: &[(String, String)]) -> FormValues {
    let today = schema::today_kst().format("%Y-%m-%d").to_string();
    let mut store = ItemStore::new(QueueMode::Single);
    store.set_live_values(initial_values(&form.fields, &today));
    for (name, value) in overrides {
        store.set_field(name, value);
    }
    store.live_values().clone()
}

/// 写真（ファイル/フォルダ）とマニフェストから送信対象を組み立てる
fn collect_entries(
    form: &FormDefinition,
    images: &[PathBuf],
    overrides: &[(String, String)],
    manifest_path: Option<&Path>,
) -> Result<Vec<Entry>> {
    let base = base_values(form, overrides);
    let mut entries = Vec::new();

    for path in images {
        let picked = if path.is_dir() {
            scanner::scan_folder(path, MAX_ITEMS)?
        } else {
            vec![scanner::pick_file(path)?]
        };
        entries.extend(picked.into_iter().map(|p| Entry {
            path: p.path,
            rotation: p.rotation,
            values: base.clone(),
        }));
    }

    if let Some(path) = manifest_path {
        for item in manifest::load(path)? {
            let picked = scanner::pick_file(&item.image)?;
            let mut values = base.clone();
            for (name, value) in &item.values {
                values.insert(name.clone(), photo_board_common::normalize_value(name, value));
            }
            entries.push(Entry {
                path: picked.path,
                rotation: item.rotation.unwrap_or(picked.rotation),
                values,
            });
        }
    }

    if entries.is_empty() {
        return Err(BoardError::EmptyQueue);
    }
    Ok(entries)
}

fn build_orchestrator(config: &Config, form: &FormDefinition) -> Result<UploadOrchestrator> {
    let style = StyleConfig::from_form(form);
    let renderer = Arc::new(render::BoardRenderer::new(&style.font_family));
    let persistence = Arc::new(persist::FsPersistence::new(&config.camera_root, &config.app_folder));
    let options = config.upload_options();
    let api = Arc::new(HttpRemoteApi::new(&config.api_base_url, options.chunk_timeout)?);
    Ok(UploadOrchestrator::new(renderer, persistence, api, options).with_history_file(&config.history_path))
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{msg:8} [{bar:40.cyan/blue}] {pos:>3}%") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn show_progress(bar: &ProgressBar, progress: Progress) {
    bar.set_message(progress.stage.label());
    bar.set_position(progress.percent as u64);
}

fn print_skipped(skipped: &[store::ItemId]) {
    if !skipped.is_empty() {
        let ids: Vec<String> = skipped.iter().map(|id| id.to_string()).collect();
        println!("⚠ 처리하지 못한 사진: {}", ids.join(", "));
    }
}

fn default_output(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "board".to_string());
    image.with_file_name(format!("{}_board.jpg", stem))
}
