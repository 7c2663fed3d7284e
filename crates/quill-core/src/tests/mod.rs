/*! Cross-module checks for the core building blocks.
 *
 * Individual modules test themselves; these cover the combinations the preprocessor relies on,
 * such as repeated template expansion under one name generator.
 */
