//! Briefing renderer
//!
//! Turns the latest simulation results into the system instruction handed to
//! the text-generation backend. Pure and deterministic: same input, same text.

use std::fmt::Write as _;

use crate::types::{AlgorithmMetrics, MetricValue, SimulationResults, SwarmMode};
use crate::types::simulation::metric_or_zero;

/// Localized fixed text of a briefing.
struct Labels {
    system: &'static str,
    results: &'static str,
    aco: &'static str,
    pso: &'static str,
    insights: &'static str,
    comparison: &'static str,
}

const ENGLISH: Labels = Labels {
    system: "You are Swarm Lab AI Assistant, specialized in analyzing and explaining simulation results. \
The front-end ALWAYS sends complete simulation data (`simulationResults`) automatically. \
NEVER ask users to provide raw data, metrics, or upload files - you already have everything needed. \
When users say vague things like 'explain results', 'compare', or 'which is best', you must analyze the latest simulationResults directly. \
Output must be structured in Markdown with clear sections, tables, and bullet points. \
Be concise, analytical, and structured. Provide insights and comparisons, not just descriptions. \
Treat simulationResults as the single source of truth. \
Never say 'I didn't receive data' - if the object exists, assume it is valid.",
    results: "📊 Current Simulation Results",
    aco: "🐜 ACO (Ant Colony Optimization)",
    pso: "🐦 PSO (Particle Swarm Optimization)",
    insights: "💡 Key Insights",
    comparison: "🔍 Algorithm Comparison",
};

const INDONESIAN: Labels = Labels {
    system: "Anda adalah Asisten AI Swarm Lab, khusus dalam menganalisis dan menjelaskan hasil simulasi. \
Front-end SELALU mengirim data simulasi lengkap (`simulationResults`) secara otomatis. \
TIDAK PERNAH meminta pengguna untuk memberikan data mentah, metrik, atau mengunggah file - Anda sudah memiliki semua yang dibutuhkan. \
Ketika pengguna mengatakan hal-hal umum seperti 'jelaskan hasilnya', 'bandingkan', atau 'yang terbaik', Anda harus langsung menganalisis simulationResults terbaru. \
Keluaran harus terstruktur dalam Markdown dengan bagian yang jelas, tabel, dan poin-poin. \
Ringkas, analitis, dan terstruktur. Berikan wawasan dan perbandingan, bukan hanya deskripsi. \
Perlakukan simulationResults sebagai sumber kebenaran tunggal. \
Jangan pernah mengatakan 'saya tidak menerima data' - jika objek ada, anggap valid.",
    results: "📊 Hasil Simulasi Saat Ini",
    aco: "🐜 ACO (Ant Colony Optimization)",
    pso: "🐦 PSO (Particle Swarm Optimization)",
    insights: "💡 Wawasan Utama",
    comparison: "🔍 Perbandingan Algoritma",
};

const CHINESE: Labels = Labels {
    system: "您是Swarm Lab AI助手，专门分析和解释模拟结果。前端始终自动发送完整的模拟数据（`simulationResults`）。\
绝不要求用户提供原始数据、指标或上传文件 - 您已经拥有所需的一切。\
当用户说模糊的话如'解释结果'、'比较'或'哪个最好'时，您必须直接分析最新的simulationResults。\
输出必须用Markdown结构化，包含清晰部分、表格和要点。简洁、分析性强、结构化。提供见解和比较，而非仅描述。\
将simulationResults视为唯一真实来源。绝不说'我没收到数据' - 如果对象存在，假设其有效。",
    results: "📊 当前模拟结果",
    aco: "🐜 ACO（蚁群优化）",
    pso: "🐦 PSO（粒子群优化）",
    insights: "💡 关键见解",
    comparison: "🔍 算法比较",
};

fn labels_for(language: &str) -> &'static Labels {
    match language {
        "Indonesian" => &INDONESIAN,
        "Chinese" => &CHINESE,
        _ => &ENGLISH,
    }
}

/// Render the system instruction for one request.
///
/// Unknown languages use the English text but still ask the model to respond
/// in `language`.
pub fn build_briefing(results: &SimulationResults, mode: SwarmMode, language: &str) -> String {
    let labels = labels_for(language);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "{}\n\nRespond in {language}. Use proper Markdown formatting with tables, bullet points, and clear sections. \
Always analyze based on the provided simulationResults object. Never ask for missing data; assume it's complete.",
        labels.system
    );
    let _ = write!(out, "\n\n## {}\n", labels.results);

    match mode {
        SwarmMode::Both => {
            metrics_table(&mut out, labels.aco, results.aco.as_ref());
            out.push('\n');
            metrics_table(&mut out, labels.pso, results.pso.as_ref());

            let _ = write!(out, "\n\n### {}\n", labels.comparison);
            out.push_str("**ACO vs PSO Analysis:**\n");
            let _ = writeln!(
                out,
                "- **Makespan**: {} vs {} seconds",
                display_metric(results.aco.as_ref().and_then(|m| m.best_makespan.as_ref())),
                display_metric(results.pso.as_ref().and_then(|m| m.best_makespan.as_ref())),
            );
            let _ = writeln!(out, "- **Winner**: {}", better_algorithm(results));
            out.push_str("- **Efficiency**: Lower makespan = better performance\n");
            out.push_str("- **Balance**: Lower load balance index = better task distribution\n");
        }
        SwarmMode::Aco => metrics_table(&mut out, labels.aco, results.aco.as_ref()),
        SwarmMode::Pso => metrics_table(&mut out, labels.pso, results.pso.as_ref()),
    }

    let _ = write!(out, "\n\n## {}\n", labels.insights);
    out.push_str(&analysis_insights(results, mode));
    out
}

fn display_metric(value: Option<&MetricValue>) -> String {
    value.map_or_else(|| "N/A".to_string(), ToString::to_string)
}

fn metrics_table(out: &mut String, heading: &str, metrics: Option<&AlgorithmMetrics>) {
    let field = |f: fn(&AlgorithmMetrics) -> Option<&MetricValue>| {
        display_metric(metrics.and_then(f))
    };
    let _ = write!(out, "\n### {heading}\n");
    out.push_str("| Metric | Value |\n|--------|--------|");
    let _ = write!(out, "\n| **Best Makespan** | {} |", field(|m| m.best_makespan.as_ref()));
    let _ = write!(out, "\n| **Execution Time** | {} |", field(|m| m.execution_time.as_ref()));
    let _ = write!(
        out,
        "\n| **Load Balance Index** | {} |",
        field(|m| m.load_balance_index.as_ref())
    );
    let _ = write!(
        out,
        "\n| **Computation Time** | {} |",
        field(|m| m.computation_time.as_ref())
    );
    let _ = write!(
        out,
        "\n| **Agents** | {} |",
        metrics.map_or(0, AlgorithmMetrics::agent_count)
    );
}

fn makespan(metrics: Option<&AlgorithmMetrics>) -> Option<f64> {
    metric_or_zero(metrics.and_then(|m| m.best_makespan.as_ref()))
}

fn load_balance(metrics: Option<&AlgorithmMetrics>) -> Option<f64> {
    metric_or_zero(metrics.and_then(|m| m.load_balance_index.as_ref()))
}

/// Which algorithm reached the lower makespan. A zero makespan counts as "no result".
pub fn better_algorithm(results: &SimulationResults) -> &'static str {
    let (Some(aco), Some(pso)) = (makespan(results.aco.as_ref()), makespan(results.pso.as_ref()))
    else {
        return "ACO vs PSO (data comparison pending)";
    };
    if aco == 0.0 && pso == 0.0 {
        "N/A"
    } else if aco == 0.0 {
        "PSO"
    } else if pso == 0.0 {
        "ACO"
    } else if aco < pso {
        "ACO (better makespan)"
    } else if pso < aco {
        "PSO (better makespan)"
    } else {
        "Tie (equal performance)"
    }
}

/// Zero and unreadable values render as `N/A`.
fn number_or_na(value: Option<f64>) -> String {
    match value {
        Some(n) if n != 0.0 => n.to_string(),
        _ => "N/A".to_string(),
    }
}

fn analysis_insights(results: &SimulationResults, mode: SwarmMode) -> String {
    let mut out = String::new();
    match mode {
        SwarmMode::Both => {
            let aco_balance = load_balance(results.aco.as_ref());
            let pso_balance = load_balance(results.pso.as_ref());
            let balance_winner = match (aco_balance, pso_balance) {
                (Some(a), Some(p)) if a < p => "ACO",
                _ => "PSO",
            };
            let winner = better_algorithm(results);
            out.push_str("**Algorithm Comparison:**\n");
            let _ = writeln!(out, "- **Best Makespan**: {winner} performs better");
            let _ = writeln!(out, "- **Load Balance**: {balance_winner} has better task distribution");
            out.push_str("- **Efficiency**: Consider both makespan and load balance\n");
            let _ = writeln!(out, "- **Recommendation**: Use {winner} for optimal performance");
        }
        SwarmMode::Aco => {
            let metrics = results.aco.as_ref();
            out.push_str("**ACO Analysis:**\n");
            let _ = writeln!(
                out,
                "- **Performance**: Makespan of {} seconds",
                number_or_na(makespan(metrics))
            );
            let _ = writeln!(
                out,
                "- **Balance**: Load balance index of {}",
                number_or_na(load_balance(metrics))
            );
            out.push_str("- **Optimization**: Tune parameters for better convergence\n");
            out.push_str("- **Scalability**: Evaluate agent utilization efficiency\n");
        }
        SwarmMode::Pso => {
            let metrics = results.pso.as_ref();
            out.push_str("**PSO Analysis:**\n");
            let _ = writeln!(
                out,
                "- **Performance**: Makespan of {} seconds",
                number_or_na(makespan(metrics))
            );
            let _ = writeln!(
                out,
                "- **Balance**: Load balance index of {}",
                number_or_na(load_balance(metrics))
            );
            out.push_str("- **Convergence**: Evaluate swarm optimization efficiency\n");
            out.push_str("- **Parameters**: Consider swarm size and iteration count\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(makespan: f64, balance: f64, agents: usize) -> AlgorithmMetrics {
        AlgorithmMetrics {
            best_makespan: Some(MetricValue::Number(makespan)),
            execution_time: Some(MetricValue::Text("1.2s".into())),
            load_balance_index: Some(MetricValue::Number(balance)),
            computation_time: None,
            final_assignment: Some(vec![serde_json::Value::Null; agents]),
        }
    }

    #[test]
    fn both_mode_renders_tables_and_comparison() {
        let results = SimulationResults::default()
            .with_aco(metrics(40.0, 0.2, 5))
            .with_pso(metrics(45.5, 0.1, 5));
        let brief = build_briefing(&results, SwarmMode::Both, "English");

        assert!(brief.starts_with("You are Swarm Lab AI Assistant"));
        assert!(brief.contains("Respond in English."));
        assert!(brief.contains("### 🐜 ACO (Ant Colony Optimization)"));
        assert!(brief.contains("### 🐦 PSO (Particle Swarm Optimization)"));
        assert!(brief.contains("| **Best Makespan** | 40 |"));
        assert!(brief.contains("| **Best Makespan** | 45.5 |"));
        assert!(brief.contains("| **Computation Time** | N/A |"));
        assert!(brief.contains("| **Agents** | 5 |"));
        assert!(brief.contains("- **Makespan**: 40 vs 45.5 seconds"));
        assert!(brief.contains("- **Winner**: ACO (better makespan)"));
        assert!(brief.contains("- **Load Balance**: PSO has better task distribution"));
    }

    #[test]
    fn single_mode_only_shows_its_algorithm() {
        let results = SimulationResults::default().with_aco(metrics(40.0, 0.2, 3));
        let brief = build_briefing(&results, SwarmMode::Aco, "English");
        assert!(brief.contains("ACO (Ant Colony Optimization)"));
        assert!(!brief.contains("PSO (Particle Swarm Optimization)"));
        assert!(brief.contains("- **Performance**: Makespan of 40 seconds"));
        assert!(brief.contains("- **Balance**: Load balance index of 0.2"));

        let brief = build_briefing(&results, SwarmMode::Pso, "English");
        assert!(brief.contains("| **Best Makespan** | N/A |"));
        assert!(brief.contains("| **Agents** | 0 |"));
        assert!(brief.contains("- **Performance**: Makespan of N/A seconds"));
    }

    #[test]
    fn localized_labels_and_fallback() {
        let results = SimulationResults::default();
        let brief = build_briefing(&results, SwarmMode::Both, "Indonesian");
        assert!(brief.contains("## 📊 Hasil Simulasi Saat Ini"));
        assert!(brief.contains("Respond in Indonesian."));

        let brief = build_briefing(&results, SwarmMode::Both, "Chinese");
        assert!(brief.contains("## 💡 关键见解"));

        let brief = build_briefing(&results, SwarmMode::Both, "French");
        assert!(brief.contains("## 📊 Current Simulation Results"));
        assert!(brief.contains("Respond in French."));
    }

    #[test]
    fn winner_rules() {
        let mk = |aco: Option<MetricValue>, pso: Option<MetricValue>| SimulationResults {
            aco: Some(AlgorithmMetrics {
                best_makespan: aco,
                ..Default::default()
            }),
            pso: Some(AlgorithmMetrics {
                best_makespan: pso,
                ..Default::default()
            }),
            ..Default::default()
        };
        let n = |v: f64| Some(MetricValue::Number(v));

        assert_eq!(better_algorithm(&SimulationResults::default()), "N/A");
        assert_eq!(better_algorithm(&mk(n(0.0), n(12.0))), "PSO");
        assert_eq!(better_algorithm(&mk(n(12.0), None)), "ACO");
        assert_eq!(better_algorithm(&mk(n(9.0), n(12.0))), "ACO (better makespan)");
        assert_eq!(better_algorithm(&mk(n(13.0), n(12.0))), "PSO (better makespan)");
        assert_eq!(better_algorithm(&mk(n(12.0), n(12.0))), "Tie (equal performance)");
        assert_eq!(
            better_algorithm(&mk(Some(MetricValue::Text("pending".into())), n(1.0))),
            "ACO vs PSO (data comparison pending)"
        );
    }

    #[test]
    fn briefing_is_deterministic() {
        let results = SimulationResults::default().with_pso(metrics(10.0, 0.5, 2));
        assert_eq!(
            build_briefing(&results, SwarmMode::Pso, "English"),
            build_briefing(&results, SwarmMode::Pso, "English")
        );
    }
}
