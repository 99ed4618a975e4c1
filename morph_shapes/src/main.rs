//! Print bounds, centroid and mean colour for each generated shape.
//!
//! ```text
//! shape_stats [--count N] [--seed S] [shape …]
//! ```

use morph_shapes::{generate_shape, ParticleSet, Shape};
use glam::Vec3;
use rand::{rngs::StdRng, SeedableRng};

struct Options {
    count:  usize,
    seed:   u64,
    shapes: Vec<Shape>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Options, String> {
    let mut opts = Options { count: 15_000, seed: 42, shapes: Vec::new() };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--count" => {
                let v = args.next().ok_or("--count needs a value")?;
                opts.count = match v.parse::<usize>() {
                    Ok(n) if n > 0 => n,
                    _ => return Err(format!("--count expects a positive integer, got `{}`", v)),
                };
            }
            "--seed" => {
                let v = args.next().ok_or("--seed needs a value")?;
                opts.seed = v.parse()
                    .map_err(|_| format!("--seed expects an unsigned integer, got `{}`", v))?;
            }
            name => opts.shapes.push(name.parse::<Shape>().map_err(|e| e.to_string())?),
        }
    }
    if opts.shapes.is_empty() {
        opts.shapes.extend(Shape::ALL);
    }
    Ok(opts)
}

fn main() {
    let Options { count, seed, shapes } = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("  ⚠  {}", e);
            std::process::exit(2);
        }
    };

    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           Particle Shape Statistics                  ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!("  {} particles, seed {}", count, seed);
    println!();
    println!("  {:<8} {:>8} {:>8} {:>22} {:>20}", "shape", "r min", "r max", "centroid", "mean rgb");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut particles = ParticleSet::new(count, &mut rng);

    for shape in shapes {
        generate_shape(&mut particles, shape, &mut rng);

        let mut r_min = f32::INFINITY;
        let mut r_max = 0.0_f32;
        let mut sum   = Vec3::ZERO;
        let mut rgb   = Vec3::ZERO;
        for i in 0..particles.count() {
            let p = particles.target(i);
            r_min = r_min.min(p.length());
            r_max = r_max.max(p.length());
            sum += p;
            rgb += particles.color(i);
        }
        let n = particles.count() as f32;
        let c = sum / n;
        let m = rgb / n;

        println!(
            "  {:<8} {:>8.3} {:>8.3}   ({:>6.2},{:>6.2},{:>6.2})   ({:.2}, {:.2}, {:.2})",
            shape.name(), r_min, r_max, c.x, c.y, c.z, m.x, m.y, m.z
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_cover_every_shape() {
        let opts = parse_args(args(&[])).unwrap();
        assert_eq!(opts.count, 15_000);
        assert_eq!(opts.seed, 42);
        assert_eq!(opts.shapes, Shape::ALL);
    }

    #[test]
    fn explicit_values_parse() {
        let opts = parse_args(args(&["--count", "500", "--seed", "7", "torus"])).unwrap();
        assert_eq!(opts.count, 500);
        assert_eq!(opts.seed, 7);
        assert_eq!(opts.shapes, [Shape::Torus]);
    }

    #[test]
    fn malformed_numbers_are_errors() {
        assert!(parse_args(args(&["--count", "lots"])).is_err());
        assert!(parse_args(args(&["--count", "0"])).is_err());
        assert!(parse_args(args(&["--seed", "-3"])).is_err());
        assert!(parse_args(args(&["--seed"])).is_err());
        assert!(parse_args(args(&["cube"])).is_err());
    }
}
