use photo_board_common::{
    compute_layout, CanvasDimensions, EstimatedMetrics, FormDefinition, StyleConfig, TableLayout,
};
use photo_board_common::values::initial_values;
use std::env;
use std::path::Path;

/// プレビュー幅の候補（スマホ画面幅 × 0.7 相当）
const PREVIEW_WIDTHS: &[u32] = &[252, 288, 360, 512];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: layout_cases <form.json>");
        std::process::exit(1);
    }

    let form_path = Path::new(&args[1]);
    if !form_path.exists() {
        eprintln!("Form not found: {}", form_path.display());
        std::process::exit(1);
    }

    let content = std::fs::read_to_string(form_path)?;
    let form: FormDefinition = serde_json::from_str(&content)?;
    let style = StyleConfig::from_form(&form);
    let mut values = initial_values(&form.fields, "2024-01-01");
    for field in &form.fields {
        let entry = values.entry(field.name.clone()).or_default();
        if entry.is_empty() {
            *entry = field.name.repeat(2);
        }
    }

    let capture = compute_layout(&form.fields, &values, style.capture, &style, &EstimatedMetrics);
    println!("form: {} ({} fields)", form.form_name, form.fields.len());
    print_case("capture", style.capture, &capture, None);

    for &width in PREVIEW_WIDTHS {
        let dims = style.capture.scaled_to_width(width);
        let preview = compute_layout(&form.fields, &values, dims, &style, &EstimatedMetrics);
        print_case("preview", dims, &preview, Some(&capture));
    }

    Ok(())
}

fn print_case(label: &str, dims: CanvasDimensions, layout: &TableLayout, reference: Option<&TableLayout>) {
    let ratio = reference
        .map(|r| format!(" ratio={:.3}", layout.table_width as f32 / r.table_width.max(1) as f32))
        .unwrap_or_default();
    let dims = dims.to_string();
    println!(
        "{label:<8} {dims:<10} font={:<3} row={:<3} col1={:<4} col2={:<4} table={}x{} at ({},{}){ratio}",
        layout.font_size,
        layout.row_height,
        layout.col1_width,
        layout.col2_width,
        layout.table_width,
        layout.table_height,
        layout.left,
        layout.top,
    );
}
