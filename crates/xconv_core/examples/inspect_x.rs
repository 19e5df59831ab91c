//! Example: Parse and inspect a legacy `.x` file.
//!
//! Run with: cargo run --example inspect_x -- assets/model.x

use std::env;
use std::path::Path;

use xconv_core::scene::Frame;
use xconv_core::timeline::Timeline;
use xconv_core::{read_x_file, ConvertOptions};

fn print_frame(frame: &Frame, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{}{} ({} meshes)", indent, frame.name, frame.meshes.len());
    for mesh in &frame.meshes {
        println!(
            "{}  - {}: {} vertices, {} triangles, normals: {}, uvs: {}, colors: {}",
            indent,
            mesh.name,
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.has_normals(),
            mesh.has_uvs(),
            mesh.has_colors()
        );
    }
    for child in &frame.children {
        print_frame(child, depth + 1);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_x <path-to-x-file>");
        println!("\nExample:");
        println!("  cargo run --example inspect_x -- assets/model.x");
        return;
    }

    let path = &args[1];
    println!("Loading .x file: {}", path);

    match read_x_file(Path::new(path), &ConvertOptions::default()) {
        Ok(parsed) => {
            let doc = &parsed.document;
            println!("\n=== Document ===");
            println!("Materials: {}", doc.material_count());
            println!("Frames: {}", doc.frame_count());
            println!("Meshes: {}", doc.mesh_count());
            println!("Total triangles: {}", doc.total_triangle_count());

            println!("\n--- Materials ---");
            for material in &doc.materials {
                let c = material.face_color;
                println!(
                    "  {} - color ({:.2}, {:.2}, {:.2}, {:.2}), power {:.2}, texture: {}",
                    material.name,
                    c.x,
                    c.y,
                    c.z,
                    c.w,
                    material.power,
                    material.texture_filename.as_deref().unwrap_or("-")
                );
            }

            println!("\n--- Frames ---");
            print_frame(&doc.root, 1);

            for set in &doc.animation_sets {
                let timeline = Timeline::build(set);
                println!("\n--- Animation Set: {} ---", set.name);
                println!("  Clips: {}, keys: {}", set.clips.len(), set.key_count());
                println!("  Joints: {}", timeline.joints.join(", "));
                println!("  End time: {}", timeline.end_time);
            }
        }
        Err(e) => {
            eprintln!("Error loading .x file: {}", e);
        }
    }
}
