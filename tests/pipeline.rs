use std::collections::HashSet;
use std::path::PathBuf;

use mutation_weights::analysis::{check_regional_enrichment, constraint_gene_de_novos, StudyData};
use mutation_weights::cadd::{
    annotate_constraint, merge_rates_and_cadd, ptv_site_enrichment, release_scores, score_bin_enrichment,
    ANNOTATION_THRESHOLDS,
};
use mutation_weights::constraint::constrained_sites;
use mutation_weights::parser;
use mutation_weights::rates::assembly::{gene_site_rates, genes_site_rates};
use mutation_weights::rates::{RateTable, SiteConsequence};
use mutation_weights::stats::Group;
use mutation_weights::variants::load_de_novos;
use mutation_weights::{Cohort, ConstraintTable, Thresholds, TranscriptTable};

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn transcripts() -> TranscriptTable {
    TranscriptTable::from_file(data("transcripts.tsv")).unwrap()
}

fn constraint() -> ConstraintTable {
    ConstraintTable::from_file(data("constraint.tsv")).unwrap()
}

fn model() -> RateTable {
    RateTable::from_file(data("site_rates.tsv")).unwrap()
}

fn cohort() -> Cohort {
    Cohort::from_files(data("trios.tsv"), data("families.tsv")).unwrap()
}

#[test]
fn load_tables() {
    let table = constraint();
    assert_eq!(table.len(), 5);
    assert_eq!(table.transcript_count(), 3);
    assert_eq!(table.genes().len(), 3);

    // the non-coding transcript of GENE9 is skipped
    let transcripts = transcripts();
    assert_eq!(transcripts.len(), 3);
    assert_eq!(transcripts.gene_transcripts("GENE1").len(), 2);
    assert!(transcripts.gene_transcripts("GENE9").is_empty());

    // one duplicated site
    assert_eq!(model().len(), 285);

    assert_eq!(cohort(), Cohort::new(5, 4));
}

#[test]
fn validated_de_novos() {
    let de_novos = load_de_novos(data("de_novos.tsv"), data("validations.tsv"), true).unwrap();
    let ids: Vec<&str> = de_novos.iter().map(|v| v.person_id.as_str()).collect();
    assert_eq!(ids, vec!["P1", "P2", "P3", "P4", "P5", "P6", "P8"]);

    let snvs = load_de_novos(data("de_novos.tsv"), data("validations.tsv"), false).unwrap();
    assert_eq!(snvs.len(), 6);
    assert!(snvs.iter().all(|v| v.is_snv()));
}

#[test]
fn constrained_sites_of_both_strands() {
    let sites = constrained_sites(&constraint(), &transcripts(), &Thresholds::default()).unwrap();
    assert_eq!(sites.len(), 54);
    assert!(sites.contains("1", 1001));
    assert!(sites.contains("1", 1030));
    assert!(!sites.contains("1", 1031));
    assert!(!sites.contains("1", 2001));
    // the first 8 codons of the reverse strand transcript
    assert!(sites.contains("X", 5060));
    assert!(sites.contains("X", 5037));
    assert!(!sites.contains("X", 5036));
}

#[test]
fn regional_enrichment() {
    let table = constraint();
    let resolver = transcripts();
    let model = model();
    let de_novos = load_de_novos(data("de_novos.tsv"), data("validations.tsv"), true).unwrap();
    let de_novos = constraint_gene_de_novos(&de_novos, &table);
    assert_eq!(de_novos.len(), 7);

    let data = StudyData {
        constraint: &table,
        de_novos: &de_novos,
        resolver: &resolver,
        model: &model,
        cohort: cohort(),
    };
    let result = check_regional_enrichment(&data, &Thresholds::default()).unwrap();

    assert_eq!(result.constrained[&Group::Ptv].observed, 2);
    assert_eq!(result.constrained[&Group::Pav].observed, 2);
    assert_eq!(result.unconstrained[&Group::Ptv].observed, 0);
    assert_eq!(result.unconstrained[&Group::Pav].observed, 2);
    assert!((result.unconstrained[&Group::Ptv].p_value - 1.0).abs() < f64::EPSILON);

    // 30 autosomal and 24 chrX missense sites, plus the missense share of indels
    let scale_x = 18.0 * cohort().x_factor();
    let missense_snv = 30.0 * 2e-8 * 18.0 + 24.0 * 2e-8 * scale_x;
    let pav = result.constrained[&Group::Pav];
    assert!(pav.expected > missense_snv);
    assert!(pav.ratio > result.unconstrained[&Group::Pav].ratio);

    assert!(result.ptv_diff.p_value <= 1.0);
    assert!(result.pav_diff.p_value <= 1.0);
}

#[test]
fn assemble_gene_rates() {
    let transcripts = transcripts();
    let model = model();

    let gene1 = gene_site_rates("GENE1", transcripts.gene_transcripts("GENE1"), &model).unwrap();
    assert_eq!(gene1.len(), 143);
    assert!(gene1.iter().all(|site| site.symbol == "GENE1"));
    assert!(!gene1.iter().any(|site| site.pos == 1500));
    let splice: Vec<u64> = gene1
        .iter()
        .filter(|site| site.cq == SiteConsequence::SpliceLof)
        .map(|site| site.pos)
        .collect();
    assert_eq!(splice, vec![999, 2031]);

    let dominant = parser::ddg2p::dominant_genes(data("ddg2p.csv"), false).unwrap();
    let expected: HashSet<String> = ["GENE1", "GENE2"].into_iter().map(String::from).collect();
    assert_eq!(dominant, expected);
    let possible = parser::ddg2p::dominant_genes(data("ddg2p.csv"), true).unwrap();
    assert!(possible.contains("GENE4"));

    let mut symbols: Vec<&str> = possible.iter().map(String::as_str).collect();
    symbols.sort_unstable();
    // GENE3 and GENE4 have no transcripts
    let rates = genes_site_rates(symbols, &transcripts, &model).unwrap();
    assert_eq!(rates.len(), 284);

    let path = std::env::temp_dir().join("mutation_weights_pipeline_rates.tsv.gz");
    parser::rates::write(&path, &rates).unwrap();
    let reloaded = RateTable::from_file(&path).unwrap();
    assert_eq!(reloaded.len(), 284);
    let gene2 = reloaded.rates().iter().filter(|site| site.symbol == "GENE2").count();
    assert_eq!(gene2, 141);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn cadd_score_pipeline() {
    let model = model();
    let scores = release_scores(data("cadd_release.tsv"), model.rates()).unwrap();
    let positions: Vec<(&str, u64)> = scores.iter().map(|s| (s.chrom.as_str(), s.pos)).collect();
    assert_eq!(positions, vec![("1", 1001), ("1", 1001), ("1", 1500), ("X", 5050)]);

    let mut sites = merge_rates_and_cadd(model.rates().to_vec(), &scores);
    assert_eq!(sites.len(), model.len());
    assert_eq!(sites.iter().filter(|site| site.score.is_some()).count(), 4);

    annotate_constraint(&mut sites, &constraint(), &transcripts(), &ANNOTATION_THRESHOLDS).unwrap();
    let scored: Vec<(u64, bool)> = sites
        .iter()
        .filter(|site| site.score.is_some())
        .map(|site| (site.rate.pos, site.constrained))
        .collect();
    assert!(scored.contains(&(1001, true)));
    assert!(scored.contains(&(1500, false)));
    assert!(scored.contains(&(5050, true)));

    let de_novos = load_de_novos(data("de_novos.tsv"), data("validations.tsv"), false).unwrap();
    let missense: Vec<_> = sites
        .iter()
        .filter(|site| site.rate.cq == SiteConsequence::Missense)
        .collect();
    let bin = score_bin_enrichment(missense.iter().copied(), &de_novos, 20.0, Some(30.0)).unwrap();
    // 1:1001 A>G and X:5050 A>G, with one de novo at the latter
    assert_eq!(bin.sites, 2);
    assert!((bin.ratio - 1.0 / 4e-8).abs() / bin.ratio < 1e-9);

    let genes: HashSet<&str> = model.symbols().into_iter().collect();
    let ptv = ptv_site_enrichment(&de_novos, &genes, model.rates()).unwrap();
    // the indel P6 is not part of the SNV set
    assert!((ptv - 1.0 / 2.3e-7).abs() / ptv < 1e-9);
}
