use crate::engines::generation::genome::{
    ChromosomeId, GeneKind, GeneTemplate, GeneValue, StrategyChromosome, StrategyGene,
};
use chrono::Utc;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Probability that a mutable flag gene flips during mutation
pub const FLAG_FLIP_PROBABILITY: f64 = 0.1;

/// Mutation standard deviation as a fraction of the gene range width
pub const MUTATION_SIGMA_FRACTION: f64 = 0.1;

/// Random chromosome drawn from the templates: ranged genes uniform in range,
/// flags 50/50, fixed genes at their default.
pub fn random_chromosome<R: Rng>(
    templates: &[GeneTemplate],
    id: ChromosomeId,
    generation: u32,
    rng: &mut R,
) -> StrategyChromosome {
    let genes = templates
        .iter()
        .map(|template| {
            let value = match &template.kind {
                GeneKind::Ranged { min, max } => GeneValue::Numeric(rng.gen_range(*min..=*max)),
                GeneKind::Flag => GeneValue::Flag(rng.gen_bool(0.5)),
                GeneKind::Fixed(value) => value.clone(),
            };
            template.instantiate(value)
        })
        .collect();

    StrategyChromosome {
        id,
        generation,
        genes,
        fitness: 0.0,
        parent_ids: Vec::new(),
        mutations: 0,
        birth_date: Utc::now(),
    }
}

/// Tournament selection: pick best of K random candidates (with replacement).
/// K is clamped to the population size. `None` only for an empty population.
pub fn tournament_selection<'a, R: Rng>(
    population: &'a [StrategyChromosome],
    tournament_size: usize,
    rng: &mut R,
) -> Option<&'a StrategyChromosome> {
    if population.is_empty() {
        return None;
    }
    let rounds = tournament_size.clamp(1, population.len());

    let mut best = &population[rng.gen_range(0..population.len())];
    for _ in 1..rounds {
        let candidate = &population[rng.gen_range(0..population.len())];
        if candidate.fitness > best.fitness {
            best = candidate;
        }
    }

    Some(best)
}

/// Blend crossover: numeric genes take `g1 * t + g2 * (1 - t)` with a fresh
/// `t` per gene; every other gene comes from a parent chosen per gene.
pub fn blend_crossover<R: Rng>(
    parent1: &StrategyChromosome,
    parent2: &StrategyChromosome,
    id: ChromosomeId,
    generation: u32,
    rng: &mut R,
) -> StrategyChromosome {
    let genes = parent1
        .genes
        .iter()
        .zip(&parent2.genes)
        .map(|(g1, g2)| blend_gene(g1, g2, rng))
        .collect();

    StrategyChromosome {
        id,
        generation,
        genes,
        fitness: 0.0,
        parent_ids: vec![parent1.id, parent2.id],
        mutations: 0,
        birth_date: Utc::now(),
    }
}

fn blend_gene<R: Rng>(g1: &StrategyGene, g2: &StrategyGene, rng: &mut R) -> StrategyGene {
    match (&g1.value, &g2.value) {
        (GeneValue::Numeric(a), GeneValue::Numeric(b)) => {
            let t: f64 = rng.gen();
            let mut child = g1.clone();
            child.set_numeric(a * t + b * (1.0 - t));
            child
        }
        _ => {
            if rng.gen_bool(0.5) {
                g1.clone()
            } else {
                g2.clone()
            }
        }
    }
}

/// Copy of a parent with a new identity and a single lineage link.
pub fn clone_chromosome(
    parent: &StrategyChromosome,
    id: ChromosomeId,
    generation: u32,
) -> StrategyChromosome {
    StrategyChromosome {
        id,
        generation,
        genes: parent.genes.clone(),
        fitness: 0.0,
        parent_ids: vec![parent.id],
        mutations: 0,
        birth_date: Utc::now(),
    }
}

/// Gaussian mutation over mutable genes: ranged numeric genes move by
/// `N(0, 0.1 * width)` and are clamped back, flags flip with probability 0.1.
pub fn gaussian_mutation<R: Rng>(chromosome: &mut StrategyChromosome, rng: &mut R) {
    for gene in chromosome.genes.iter_mut().filter(|g| g.mutable) {
        mutate_gene(gene, rng);
    }
    chromosome.mutations += 1;
    chromosome.fitness = 0.0;
}

fn mutate_gene<R: Rng>(gene: &mut StrategyGene, rng: &mut R) {
    match gene.value {
        GeneValue::Numeric(value) => {
            let Some(range) = gene.range else {
                return;
            };
            let sigma = range.width() * MUTATION_SIGMA_FRACTION;
            if sigma <= 0.0 {
                return;
            }
            if let Ok(normal) = Normal::new(0.0, sigma) {
                gene.set_numeric(value + normal.sample(rng));
            }
        }
        GeneValue::Flag(flag) => {
            if rng.gen_bool(FLAG_FLIP_PROBABILITY) {
                gene.value = GeneValue::Flag(!flag);
            }
        }
        GeneValue::Label(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::genome::{default_gene_templates, GeneCategory};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn population(fitness: &[f64], rng: &mut StdRng) -> Vec<StrategyChromosome> {
        let templates = default_gene_templates();
        fitness
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let mut c = random_chromosome(&templates, ChromosomeId(i as u64), 0, rng);
                c.fitness = *f;
                c
            })
            .collect()
    }

    #[test]
    fn test_random_chromosome_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let templates = default_gene_templates();
        for i in 0..200 {
            let c = random_chromosome(&templates, ChromosomeId(i), 0, &mut rng);
            assert_eq!(c.genes.len(), templates.len());
            assert!(c.genes_in_range());
            assert!(c.parent_ids.is_empty());
        }
    }

    #[test]
    fn test_tournament_clamps_to_population() {
        let mut rng = StdRng::seed_from_u64(1);
        let pop = population(&[0.1, 0.9], &mut rng);
        // k far above the population size is clamped, not an error
        let winner = tournament_selection(&pop, 500, &mut rng).unwrap();
        assert!(winner.fitness == 0.9 || winner.fitness == 0.1);

        let single = population(&[0.4], &mut rng);
        let winner = tournament_selection(&single, 5, &mut rng).unwrap();
        assert_eq!(winner.id, single[0].id);

        assert!(tournament_selection(&[], 5, &mut rng).is_none());
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut rng = StdRng::seed_from_u64(3);
        let fitness: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let pop = population(&fitness, &mut rng);

        let mean: f64 = (0..1000)
            .map(|_| tournament_selection(&pop, 5, &mut rng).unwrap().fitness)
            .sum::<f64>()
            / 1000.0;
        assert!(mean > 9.5, "mean winner fitness {}", mean);
    }

    #[test]
    fn test_crossover_is_convex_and_linked() {
        let mut rng = StdRng::seed_from_u64(11);
        let pop = population(&[0.0, 0.0], &mut rng);
        let child = blend_crossover(&pop[0], &pop[1], ChromosomeId(99), 4, &mut rng);

        assert_eq!(child.parent_ids, vec![pop[0].id, pop[1].id]);
        assert_eq!(child.generation, 4);
        assert_eq!(child.mutations, 0);
        for ((c, a), b) in child.genes.iter().zip(&pop[0].genes).zip(&pop[1].genes) {
            assert_eq!(c.name, a.name);
            match (c.numeric(), a.numeric(), b.numeric()) {
                (Some(v), Some(x), Some(y)) => {
                    assert!(v >= x.min(y) - 1e-9 && v <= x.max(y) + 1e-9);
                }
                _ => assert!(c.value == a.value || c.value == b.value),
            }
        }
    }

    #[test]
    fn test_clone_links_single_parent() {
        let mut rng = StdRng::seed_from_u64(5);
        let pop = population(&[0.7], &mut rng);
        let child = clone_chromosome(&pop[0], ChromosomeId(50), 2);
        assert_eq!(child.parent_ids, vec![pop[0].id]);
        assert_eq!(child.genes, pop[0].genes);
        assert_ne!(child.id, pop[0].id);
    }

    #[test]
    fn test_mutation_skips_immutable_genes() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut pop = population(&[0.0], &mut rng);
        let before = pop[0].clone();
        for _ in 0..100 {
            gaussian_mutation(&mut pop[0], &mut rng);
        }
        assert_eq!(pop[0].mutations, 100);
        let flag = "dynamic_pricing_enabled";
        assert_eq!(pop[0].gene(flag).unwrap().value, before.gene(flag).unwrap().value);
        assert_ne!(pop[0].genes, before.genes);
        assert!(pop[0].genes_in_range());
    }

    #[test]
    fn test_mutable_flag_flips_at_configured_rate() {
        let mut rng = StdRng::seed_from_u64(21);
        let template = GeneTemplate {
            name: "express_shipping".to_string(),
            category: GeneCategory::Pricing,
            kind: GeneKind::Flag,
            mutable: true,
            weight: 0.1,
        };
        let mut chromosome = random_chromosome(&[template], ChromosomeId(0), 0, &mut rng);

        let rounds = 2000;
        let mut flips = 0;
        for _ in 0..rounds {
            let before = chromosome.genes[0].value.clone();
            gaussian_mutation(&mut chromosome, &mut rng);
            if chromosome.genes[0].value != before {
                flips += 1;
            }
        }

        let rate = flips as f64 / rounds as f64;
        assert!((0.07..=0.13).contains(&rate), "flip rate {}", rate);
        assert_eq!(chromosome.mutations, rounds);
        assert!(matches!(chromosome.genes[0].value, GeneValue::Flag(_)));
    }

    proptest! {
        #[test]
        fn prop_operators_respect_ranges(seed in any::<u64>(), rounds in 1usize..20) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut pop = population(&[0.0, 0.0], &mut rng);
            for i in 0..rounds {
                let mut child = blend_crossover(&pop[0], &pop[1], ChromosomeId(100 + i as u64), 1, &mut rng);
                gaussian_mutation(&mut child, &mut rng);
                prop_assert!(child.genes_in_range());
                pop[i % 2] = child;
            }
        }
    }
}
