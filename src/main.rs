fn main() {
    println!("neoscan-rs - Neoepitope Enumeration Tool");
    println!();
    println!("🔬 RECOMMENDED: Use the main tool for most workflows:");
    println!("  neoscan      - Enumerate neoepitopes: GTF + FASTA + haplotypes → TSV");
    println!();
    println!("📋 Preparation tools for building the haplotype input:");
    println!("  merge_vcf    - Merge germline and somatic VCFs for phasing");
    println!("  prep_hapcut  - Add unphased VCF variants to HapCUT2 output");
    println!();
    println!("📖 For help with each tool:");
    println!("  cargo run --bin neoscan -- --help      # Neoepitope calling");
    println!("  cargo run --bin merge_vcf -- --help    # VCF merging");
    println!("  cargo run --bin prep_hapcut -- --help  # HapCUT2 preparation");
    println!();
    println!("🚀 Quick start example:");
    println!("  cargo run --bin neoscan -- --gtf annotation.gtf --genome genome.fa \\");
    println!("      --haplotypes phased.out --output neoepitopes.tsv");
}
