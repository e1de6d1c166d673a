use colored::Colorize;
use serde_json::json;
use tripstream::session::PlanClient;
use tripstream::transport::{PlanRequest, ScriptedTransport, TripBudget};

/// A recorded planning run, deliberately re-chunked at awkward byte offsets
/// (mid-JSON, mid-character) to show the decoder reassembling frames.
fn scripted_run() -> ScriptedTransport {
    let lines = [
        json!({"step":1,"message":"开始规划行程","action":"init","progress":5}).to_string(),
        json!({"step":2,"message":"规划交通方案","action":"transport","progress":20,"agent":"transport"}).to_string(),
        json!({"step":3,"message":"交通方案完成","action":"transport_complete","progress":35,"agent":"transport"}).to_string(),
        "{oops, not json".to_string(),
        json!({"step":4,"message":"住宿查询失败","action":"accommodation_error","progress":50,"agent":"accommodation","error":"upstream timeout"}).to_string(),
        json!({"step":5,"message":"汇总行程","action":"generate","progress":85}).to_string(),
        json!({"step":6,"message":"规划完成","action":"complete","progress":100,"data":{"id":"t1","title":"东京五日游"}}).to_string(),
    ];
    let wire: String = lines.map(|line| format!("data: {line}\n")).join("");

    // 23-byte chunks land inside payloads and multi-byte characters alike.
    let chunks = wire.as_bytes().chunks(23).map(<[u8]>::to_vec).collect();
    ScriptedTransport::new(chunks)
}

fn main() {
    let client = PlanClient::new(scripted_run()).with_token("demo-token");
    let request = PlanRequest {
        title: "东京五日游".into(),
        destinations: vec!["东京".into()],
        start_date: "2026-04-01".into(),
        end_date: "2026-04-05".into(),
        travelers: 2,
        budget: TripBudget::from_total(5000),
        preferences: json!({"pace": "relaxed"}),
    };

    let mut stream = match client.stream_plan(&request) {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!("{} {err}", "planning failed:".red().bold());
            return;
        }
    };

    let mut result = None;
    while let Some(item) = stream.next() {
        match item {
            Ok(record) => {
                let label = format!("[{:>3.0}%] step {} · {}", record.progress, record.step, record.action);
                let label = if record.phase_failed() {
                    label.red()
                } else if record.phase_succeeded() || record.is_terminal() {
                    label.green()
                } else {
                    label.normal()
                };
                println!("{label} {}", record.message);
                if let Some(error) = &record.error {
                    println!("       {} {error}", "phase error:".yellow());
                }
                if let Some(payload) = record.result_payload() {
                    result = Some(payload.clone());
                }
            }
            Err(err) => {
                eprintln!("{} {err}", "stream interrupted:".red().bold());
                break;
            }
        }
    }

    for issue in stream.issues() {
        println!("{} {} ({})", "skipped line:".yellow(), issue.line, issue.reason);
    }

    match result {
        Some(plan) => println!("\n{} {plan}", "plan ready:".green().bold()),
        None => println!("\n{}", "no plan produced".red()),
    }
}
