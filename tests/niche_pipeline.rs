//! Integration tests for the niche profiling pipeline.

use approx::assert_relative_eq;
use composable_niche::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Generated table with planted niches, plus its metadata.
fn planted_dataset(seed: u64) -> DemoDataset {
    let config = DemoConfig::new(12, 10, 2).with_specificity(0.9);
    generate_demo_dataset(&config, &mut Xorshift64::new(seed)).unwrap()
}

fn quick_config() -> NicheConfig {
    NicheConfig::default()
        .with_num_niches(2)
        .with_bootstrap_iterations(5)
}

#[test]
fn test_profiles_are_well_formed() {
    let data = planted_dataset(7);
    let analysis = profile_niches(
        &data.table,
        Some(&data.metadata),
        &quick_config(),
        &mut Xorshift64::new(1),
    )
    .unwrap();

    assert_eq!(analysis.k, 2);
    assert_eq!(analysis.profiles.len(), 12);
    for profile in &analysis.profiles {
        assert_eq!(profile.niche_weights.len(), analysis.k);
        assert_relative_eq!(profile.niche_weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(profile.niche_weights.iter().all(|&w| w >= 0.0));
        assert!(profile.primary_niche < analysis.k);
        assert!((0.0..=1.0).contains(&profile.niche_confidence));
        assert!((0.0..=1.0).contains(&profile.stability));
    }

    let total: usize = analysis.members().iter().map(|m| m.len()).sum();
    assert_eq!(total, 12);
}

#[test]
fn test_correlation_matrix_properties() {
    let data = planted_dataset(11);
    let analysis =
        profile_niches(&data.table, None, &quick_config(), &mut Xorshift64::new(2)).unwrap();

    let corr = &analysis.correlation;
    assert_eq!(corr.n_taxa(), 12);
    for i in 0..12 {
        assert_relative_eq!(corr.get(i, i), 1.0);
        for j in 0..12 {
            let r = corr.get(i, j);
            assert!(r.is_finite());
            assert!((-1.0..=1.0).contains(&r));
            assert_relative_eq!(r, corr.get(j, i), epsilon = 1e-12);
        }
    }
}

#[test]
fn test_network_edges_respect_thresholds() {
    let data = planted_dataset(5);
    let config = quick_config().with_network(
        NetworkConfig::default()
            .with_correlation_threshold(0.4)
            .with_negative(false),
    );
    let analysis = profile_niches(&data.table, None, &config, &mut Xorshift64::new(3)).unwrap();

    let network = &analysis.network;
    assert_eq!(network.nodes.len(), 12);
    for edge in &network.edges {
        assert_ne!(edge.source, edge.target);
        assert!(edge.weight >= 0.4);
        assert_eq!(edge.edge_type, EdgeType::Positive);
    }
    let degree_sum: usize = network.nodes.iter().map(|n| n.degree).sum();
    assert_eq!(degree_sum, 2 * network.edges.len());
    assert!((0.0..=1.0).contains(&network.stats.density));
}

#[test]
fn test_same_seed_is_deterministic() {
    let data = planted_dataset(3);
    let config = quick_config();
    let a = profile_niches(&data.table, Some(&data.metadata), &config, &mut Xorshift64::new(9))
        .unwrap();
    let b = profile_niches(&data.table, Some(&data.metadata), &config, &mut Xorshift64::new(9))
        .unwrap();
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
}

#[test]
fn test_closure_random_source() {
    let data = planted_dataset(4);
    let mut state = 0.0_f64;
    let mut rng = move || {
        state = (state + 0.618_033_988_75) % 1.0;
        state
    };
    let analysis = profile_niches(&data.table, None, &quick_config(), &mut rng).unwrap();
    assert_eq!(analysis.profiles.len(), 12);
}

#[test]
fn test_associated_habitats_come_from_metadata() {
    let data = planted_dataset(21);
    let analysis = profile_niches(
        &data.table,
        Some(&data.metadata),
        &quick_config(),
        &mut Xorshift64::new(4),
    )
    .unwrap();

    let known = data.metadata.habitats();
    let mut any = false;
    for profile in &analysis.profiles {
        for habitat in &profile.associated_habitats {
            assert!(known.contains(&habitat.as_str()));
            any = true;
        }
    }
    assert!(any);
}

#[test]
fn test_no_metadata_means_no_habitats() {
    let data = planted_dataset(8);
    let analysis =
        profile_niches(&data.table, None, &quick_config(), &mut Xorshift64::new(5)).unwrap();
    assert!(analysis
        .profiles
        .iter()
        .all(|p| p.associated_habitats.is_empty()));
}

#[test]
fn test_all_zero_table() {
    let table = AbundanceTable::new(
        vec!["a".into(), "b".into(), "c".into()],
        vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()],
        vec![vec![0.0; 4]; 3],
    )
    .unwrap();
    let config = NicheConfig::default()
        .with_num_niches(1)
        .with_bootstrap_iterations(3);
    let analysis = profile_niches(&table, None, &config, &mut Xorshift64::new(6)).unwrap();

    assert_eq!(analysis.k, 1);
    for profile in &analysis.profiles {
        assert_eq!(profile.primary_niche, 0);
        assert_relative_eq!(profile.niche_weights[0], 1.0, epsilon = 1e-9);
        assert!(profile.niche_confidence.is_finite());
    }
    assert!(analysis.correlation.correlations.iter().all(|r| r.is_finite()));
}

#[test]
fn test_single_taxon_single_sample() {
    let table = AbundanceTable::new(vec!["phage".into()], vec!["S1".into()], vec![vec![5.0]])
        .unwrap();
    let analysis = profile_niches(
        &table,
        None,
        &NicheConfig::default().with_bootstrap_iterations(2),
        &mut Xorshift64::new(7),
    )
    .unwrap();

    assert_eq!(analysis.profiles.len(), 1);
    assert_relative_eq!(analysis.correlation.get(0, 0), 1.0);
    assert!(analysis.network.edges.is_empty());
    let profile = &analysis.profiles[0];
    assert!(analysis.k >= 2);
    assert_relative_eq!(profile.niche_weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
}

#[test]
fn test_empty_table() {
    let table = AbundanceTable::new(Vec::new(), vec!["S1".into()], Vec::new()).unwrap();
    let analysis = profile_niches(
        &table,
        None,
        &NicheConfig::default(),
        &mut Xorshift64::new(8),
    )
    .unwrap();
    assert!(analysis.profiles.is_empty());
    assert!(analysis.network.nodes.is_empty());
    assert_eq!(analysis.network.stats.edge_count, 0);
}

#[test]
fn test_invalid_pseudocount_rejected() {
    let data = planted_dataset(1);
    let config = quick_config().with_pseudocount(0.0);
    let result = profile_niches(&data.table, None, &config, &mut Xorshift64::new(1));
    assert!(matches!(result, Err(NicheError::InvalidParameter(_))));
}

#[test]
fn test_tsv_inputs_end_to_end() {
    let mut counts = NamedTempFile::new().unwrap();
    writeln!(counts, "taxon\tS1\tS2\tS3\tS4\tS5\tS6").unwrap();
    writeln!(counts, "phage_a\t90\t80\t85\t2\t1\t3").unwrap();
    writeln!(counts, "phage_b\t70\t95\t60\t4\t0\t2").unwrap();
    writeln!(counts, "phage_c\t1\t3\t2\t88\t91\t79").unwrap();
    writeln!(counts, "phage_d\t0\t2\t5\t66\t84\t97").unwrap();
    counts.flush().unwrap();

    let mut metadata = NamedTempFile::new().unwrap();
    writeln!(metadata, "sample_id\thabitat").unwrap();
    for (sample, habitat) in [
        ("S1", "marine"),
        ("S2", "marine"),
        ("S3", "marine"),
        ("S4", "soil"),
        ("S5", "soil"),
        ("S6", "soil"),
    ] {
        writeln!(metadata, "{}\t{}", sample, habitat).unwrap();
    }
    metadata.flush().unwrap();

    let table = AbundanceTable::from_tsv(counts.path()).unwrap();
    let metadata = SampleMetadata::from_tsv(metadata.path()).unwrap();
    assert_eq!(table.n_taxa(), 4);
    assert_eq!(metadata.len(), 6);

    let analysis = profile_niches(
        &table,
        Some(&metadata),
        &quick_config().with_bootstrap_iterations(10),
        &mut Xorshift64::new(42),
    )
    .unwrap();

    let a = analysis.profile("phage_a").unwrap();
    let b = analysis.profile("phage_b").unwrap();
    let c = analysis.profile("phage_c").unwrap();
    let d = analysis.profile("phage_d").unwrap();
    assert_eq!(a.primary_niche, b.primary_niche);
    assert_eq!(c.primary_niche, d.primary_niche);
    assert_ne!(a.primary_niche, c.primary_niche);
    assert!(a.associated_habitats.iter().all(|h| h == "marine"));
    assert!(c.associated_habitats.iter().all(|h| h == "soil"));

    let json: serde_json::Value = serde_json::from_str(&analysis.to_json().unwrap()).unwrap();
    assert_eq!(json["profiles"].as_array().unwrap().len(), 4);
}
