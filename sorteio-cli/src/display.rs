use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use sorteio_db::LotteryError;
use sorteio_db::models::{Draw, GeneratedSet, RankedNumber, Variant};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_generated(variant: Variant, set: &GeneratedSet, title: &str) {
    println!("\n🍀 {}: {}\n", variant, title);

    let mut table = new_table(vec!["Quantidade", "Números"]);
    table.add_row(vec![
        Cell::new(set.len()),
        Cell::new(set).fg(Color::Green),
    ]);
    println!("{table}");
}

pub fn display_ranking(variant: Variant, ranking: &[RankedNumber], title: &str) {
    println!("\n📊 {}: {}\n", variant, title);

    if ranking.is_empty() {
        println!("Nenhum número a exibir.");
        return;
    }

    let mut table = new_table(vec!["#", "Número", "Vezes sorteado"]);
    for entry in ranking {
        table.add_row(vec![
            &entry.rank.to_string(),
            &format!("{:02}", entry.number),
            &entry.count.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn display_draws(variant: Variant, draws: &[Draw]) {
    if draws.is_empty() {
        println!("Nenhum sorteio a exibir.");
        return;
    }

    println!("\n🗓  {}: últimos resultados\n", variant);

    let mut table = new_table(vec!["Concurso", "Data", "Números"]);
    for draw in draws {
        let numbers = GeneratedSet::from_unsorted(draw.numbers.clone());
        table.add_row(vec![
            draw.draw_id.to_string(),
            draw.date.format("%d/%m/%Y").to_string(),
            numbers.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn display_refresh(variant: Variant, count: usize) {
    println!("{}: {} sorteios baixados e salvos.", variant, count);
}

/// Falhas do núcleo viram mensagem, nunca encerram o programa com erro.
pub fn display_error(variant: Variant, err: &LotteryError) {
    let hint = match err {
        LotteryError::InvalidParameter(_) => {
            let range = variant.pick_range();
            format!("A {} aceita de {} a {} números.", variant, range.start(), range.end())
        }
        LotteryError::GenerationFailed(_) | LotteryError::SourceUnavailable(_) => {
            "Verifique a conexão ou o arquivo padrão e tente novamente.".to_string()
        }
        _ => String::new(),
    };

    eprintln!("Erro: {err}");
    if !hint.is_empty() {
        eprintln!("{hint}");
    }
}
